//! Error type definitions.

use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Errors raised while loading process configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("required environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// An environment variable holds an unusable value.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv {
        var: &'static str,
        value: String,
    },
}

/// Errors raised by the durable store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Lookup for a target id returned no row.
    #[error("target {0} not found")]
    TargetNotFound(i64),

    /// The database file could not be created.
    #[error("database file creation error: {0}")]
    FileCreation(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// Errors raised while resolving sitemaps.
#[derive(Error, Debug)]
pub enum SitemapError {
    /// The target has no sitemap URL configured.
    #[error("target has no sitemap URL configured")]
    NoSitemapUrl,

    /// A configured regex pattern failed to compile.
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    /// The sitemap endpoint answered with a non-200 status.
    #[error("HTTP {0} fetching sitemap")]
    HttpStatus(u16),

    /// Auto-discovery found no sitemap at any common location.
    #[error("no sitemap found at common locations")]
    NotFound,

    /// The sitemap body failed to decode as XML.
    #[error("failed to decode sitemap XML: {0}")]
    XmlDecode(#[from] quick_xml::DeError),

    /// Transport-level failure fetching the sitemap.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The website URL could not be parsed for auto-discovery.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The store refused a lookup needed for resolution.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Reporting tags for per-URL failures.
///
/// Every worker error maps to exactly one tag; the reporter prints a
/// breakdown by tag at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    Timeout,
    ConnectionError,
    DnsError,
    NetworkError,
    ClientError,
    ServerError,
    RateLimited,
    DatabaseError,
    ParseError,
    Other,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Timeout => "timeout",
            ErrorType::ConnectionError => "connection_error",
            ErrorType::DnsError => "dns_error",
            ErrorType::NetworkError => "network_error",
            ErrorType::ClientError => "client_error",
            ErrorType::ServerError => "server_error",
            ErrorType::RateLimited => "rate_limited",
            ErrorType::DatabaseError => "database_error",
            ErrorType::ParseError => "parse_error",
            ErrorType::Other => "other",
        }
    }
}
