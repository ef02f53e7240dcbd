//! Logger initialization.
//!
//! Configures `env_logger` with either a colored human-readable format or a
//! JSON format for machine parsing. `RUST_LOG` is honored as the base
//! configuration; the explicit level passed in takes precedence.

use std::io::Write;

use colored::Colorize;
use log::LevelFilter;

use crate::config::LogFormat;

/// Initializes the process logger.
///
/// Safe to call once per process; later calls return an error from the
/// underlying logger and can be ignored in tests.
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    // Noisy dependencies stay at a coarser level than the application.
    builder.filter_module("html5ever", LevelFilter::Error);
    builder.filter_module("selectors", LevelFilter::Warn);
    builder.filter_module("sqlx", LevelFilter::Info);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("sitescraper", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"ts\":{},\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    serde_json::to_string(&record.args().to_string())
                        .unwrap_or_else(|_| "\"\"".into())
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let level = match record.level() {
                    log::Level::Error => "ERROR".red().bold().to_string(),
                    log::Level::Warn => "WARN".yellow().bold().to_string(),
                    log::Level::Info => "INFO".green().to_string(),
                    log::Level::Debug => "DEBUG".blue().to_string(),
                    log::Level::Trace => "TRACE".dimmed().to_string(),
                };
                writeln!(
                    buf,
                    "[{} {level}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    record.args()
                )
            });
        }
    }

    builder.try_init()
}
