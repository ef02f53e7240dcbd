//! Error types, retryability, and error classification.
//!
//! Typed errors cover the configuration, storage, and sitemap surfaces;
//! worker pipeline errors travel as `anyhow::Error` chains and are mapped
//! to a single reporting tag by [`classify_error`].

mod classify;
mod types;

pub use classify::{classify_error, is_retryable_error};
pub use types::{ConfigError, ErrorType, SitemapError, StorageError};
