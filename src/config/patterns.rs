//! Per-target regex pattern configuration.
//!
//! Targets carry two optional pattern lists stored as JSON: one filtering
//! sub-sitemaps inside a sitemap index, one filtering page URLs. When a
//! target has none configured (or its stored JSON is corrupt), the built-in
//! defaults below apply.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error_handling::SitemapError;

/// Regex pattern lists for a single target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Patterns matched against sub-sitemap `<loc>` values.
    pub sitemap_patterns: Vec<String>,
    /// Patterns matched against page URL `<loc>` values.
    pub url_patterns: Vec<String>,
}

impl PatternConfig {
    /// Serializes the pattern lists to JSON for database storage.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses pattern lists from their stored JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Built-in fallback patterns used when a target has none configured.
///
/// The sitemap patterns cover the common WordPress-style layouts
/// (`sitemap-1.xml`, `post-sitemap.xml`, ...); the URL pattern keeps
/// simple one-segment content paths like `/quote-text/`.
pub fn default_patterns() -> PatternConfig {
    PatternConfig {
        sitemap_patterns: vec![
            r"sitemap-\d+\.xml$".to_string(),
            r"post-sitemap[^/]*\.xml$".to_string(),
            r"posts?[-_]sitemap.*\.xml$".to_string(),
            r"content[-_]sitemap.*\.xml$".to_string(),
        ],
        url_patterns: vec![r"/[^/]+/$".to_string()],
    }
}

/// Compiles every pattern in the list.
///
/// # Errors
///
/// Returns `SitemapError::InvalidPattern` on the first pattern that fails to
/// compile; a target with a broken pattern list must not silently crawl
/// everything.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, SitemapError> {
    let mut compiled = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let regex = Regex::new(pattern).map_err(|source| SitemapError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        compiled.push(regex);
    }
    Ok(compiled)
}

/// Returns `fallback` when `patterns` is empty.
pub fn default_if_empty(patterns: Vec<String>, fallback: Vec<String>) -> Vec<String> {
    if patterns.is_empty() {
        fallback
    } else {
        patterns
    }
}
