//! Application configuration.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, retry policy)
//! - Environment loading (`SCRAPER_DB_PATH`, `SCRAPER_PORT`)
//! - Per-target pattern configuration with built-in defaults

mod constants;
mod env;
mod patterns;
mod types;

pub use constants::*;
pub use env::{load_env, Env};
pub use patterns::{compile_patterns, default_if_empty, default_patterns, PatternConfig};
pub use types::{LogFormat, LogLevel};
