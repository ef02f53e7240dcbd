//! Process environment configuration.
//!
//! Both variables are required; startup fails fast when either is missing
//! so a misconfigured deployment never runs against a surprise database.

use std::path::PathBuf;

use crate::config::constants::{ENV_DB_PATH, ENV_PORT};
use crate::error_handling::ConfigError;

/// Validated process environment.
#[derive(Debug, Clone)]
pub struct Env {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Port the admin UI binds to. Parsed and validated here even though the
    /// UI itself runs as a separate process.
    pub port: u16,
}

/// Loads and validates required environment variables.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnv` when a variable is absent and
/// `ConfigError::InvalidEnv` when `SCRAPER_PORT` is not a valid port number.
pub fn load_env() -> Result<Env, ConfigError> {
    let db_path = std::env::var(ENV_DB_PATH).map_err(|_| ConfigError::MissingEnv(ENV_DB_PATH))?;
    let port_raw = std::env::var(ENV_PORT).map_err(|_| ConfigError::MissingEnv(ENV_PORT))?;

    let port: u16 = port_raw.parse().map_err(|_| ConfigError::InvalidEnv {
        var: ENV_PORT,
        value: port_raw.clone(),
    })?;

    Ok(Env {
        db_path: PathBuf::from(db_path),
        port,
    })
}
