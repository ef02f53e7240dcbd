//! Error retryability and classification.
//!
//! Both functions operate on the rendered error chain. Worker errors carry
//! context strings like `HTTP 503: Service Unavailable` or
//! `failed to read response body`, so substring matching over the lowercased
//! chain is the stable surface here; typed downcasts cover the cases where
//! the original error is still reachable.

use anyhow::Error;

use super::types::ErrorType;

/// Substrings identifying transient network failures worth retrying.
const RETRYABLE_MESSAGES: &[&str] = &[
    "timeout",
    "connection refused",
    "network is unreachable",
    "temporary failure",
    "dns lookup failed",
    "context deadline exceeded",
    "i/o timeout",
    "connection reset by peer",
];

/// Renders the full error chain into one lowercased string.
fn chain_text(error: &Error) -> String {
    error
        .chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
        .to_lowercase()
}

/// Determines whether a fetch error is worth retrying.
///
/// Retryable: transient network conditions (timeouts, refused/reset
/// connections, DNS hiccups) and HTTP status classes 5xx, 429, and 408.
/// Everything else (4xx, parse failures, database errors) breaks the retry
/// loop immediately.
pub fn is_retryable_error(error: &Error) -> bool {
    // Typed checks first: reqwest transport errors are retryable, database
    // errors never are.
    for cause in error.chain() {
        if let Some(reqwest_err) = cause.downcast_ref::<reqwest::Error>() {
            if reqwest_err.is_timeout() || reqwest_err.is_connect() || reqwest_err.is_request() {
                return true;
            }
        }
        if cause.downcast_ref::<sqlx::Error>().is_some() {
            return false;
        }
    }

    let text = chain_text(error);

    if RETRYABLE_MESSAGES.iter().any(|m| text.contains(m)) {
        return true;
    }

    // Server errors, rate limiting, and request timeouts by status class.
    text.contains("http 5") || text.contains("http 429") || text.contains("http 408")
}

/// Maps an error to a single reporting tag.
///
/// 429/408 are checked before the generic status classes so rate limiting
/// gets its own tag instead of disappearing into `client_error`.
pub fn classify_error(error: &Error) -> ErrorType {
    for cause in error.chain() {
        if cause.downcast_ref::<sqlx::Error>().is_some() {
            return ErrorType::DatabaseError;
        }
    }

    let text = chain_text(error);

    if text.contains("timeout") || text.contains("context deadline exceeded") {
        return ErrorType::Timeout;
    }
    if text.contains("connection refused") || text.contains("connection reset") {
        return ErrorType::ConnectionError;
    }
    if text.contains("dns") {
        return ErrorType::DnsError;
    }
    if text.contains("network") {
        return ErrorType::NetworkError;
    }
    if text.contains("http 429") || text.contains("http 408") {
        return ErrorType::RateLimited;
    }
    if text.contains("http 4") {
        return ErrorType::ClientError;
    }
    if text.contains("http 5") {
        return ErrorType::ServerError;
    }
    if text.contains("database") || text.contains("sql") {
        return ErrorType::DatabaseError;
    }
    if text.contains("parse") || text.contains("decode") {
        return ErrorType::ParseError;
    }

    ErrorType::Other
}
