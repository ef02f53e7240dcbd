//! Page-structure classifier.
//!
//! Decides whether a page's structure suggests a harvestable list of short,
//! attributable text blocks, emitting up to two CSS selectors to drive
//! later extraction. Feature extraction (DOM traversal) is separated from
//! the decision tree so each half stays testable on its own.

mod decision;
mod features;

pub use decision::{DecisionReason, MAX_PAGE_SELECTORS};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use decision::decide;
use features::extract_features;

/// Extracted page features, stored alongside the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFeatures {
    pub text_char_count: i64,
    pub num_text_blocks: i64,
    pub avg_block_length: i64,
    pub longest_block_length: i64,
    pub short_block_ratio: f64,
    pub dominant_selector_ratio: f64,
    pub num_distinct_paths: i64,
    pub avg_quote_score: f64,
    pub stddev_quote_score: f64,
    pub single_author_bias: bool,
    pub has_intro_paragraph: bool,
    pub page_contains_dialog_patterns: bool,
    pub has_colorized_blocks: bool,
}

/// The classifier's verdict for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDecision {
    pub processable: bool,
    pub selectors: Vec<String>,
    pub confidence: f64,
    pub decision_reason: String,
    /// RFC 3339 classification timestamp.
    pub classified_at: String,
}

/// Full classifier record as persisted (JSON) per page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageVerdict {
    pub url: String,
    pub features: PageFeatures,
    pub decision: PageDecision,
}

impl PageVerdict {
    /// Serializes the verdict for database storage.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Classifies a page from its URL and HTML body.
///
/// Deterministic for a fixed `(url, html)` input except for
/// `classified_at`.
pub fn classify_page(url: &str, html: &str) -> PageVerdict {
    let stats = extract_features(html);
    let (features, outcome) = decide(&stats);

    PageVerdict {
        url: url.to_string(),
        features,
        decision: PageDecision {
            processable: outcome.processable,
            selectors: outcome.selectors,
            confidence: outcome.confidence,
            decision_reason: outcome.reason.as_str().to_string(),
            classified_at: Utc::now().to_rfc3339(),
        },
    }
}
