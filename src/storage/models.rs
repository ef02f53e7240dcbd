//! Row types for the durable store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A crawl configuration rooted at a single website.
///
/// Targets are soft-deleted: `is_active = false` removes them from batch
/// operations while historical pages and logs keep referencing the row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Target {
    pub id: i64,
    pub website_url: String,
    pub sitemap_url: Option<String>,
    pub user_agent: Option<String>,
    pub requests_per_second: Option<f64>,
    /// JSON array of sub-sitemap filter regexes.
    pub sitemap_patterns: Option<String>,
    /// JSON array of page URL filter regexes.
    pub url_patterns: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_visited_at: Option<DateTime<Utc>>,
}

/// Fields for creating a target.
#[derive(Debug, Clone, Default)]
pub struct NewTarget {
    pub website_url: String,
    pub sitemap_url: Option<String>,
    pub user_agent: Option<String>,
    pub requests_per_second: Option<f64>,
    pub sitemap_patterns: Option<String>,
    pub url_patterns: Option<String>,
}

/// Queue item lifecycle state.
///
/// Transitions: `pending → processing → {completed | failed}`, plus
/// `failed → pending` via explicit retry. Nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
        }
    }
}

/// A single unit of work: `(target, url)` in a known status.
#[derive(Debug, Clone, FromRow)]
pub struct QueueItem {
    pub id: i64,
    pub target_id: i64,
    pub url: String,
    pub priority: i64,
    pub status: QueueStatus,
    pub error_message: Option<String>,
    pub attempt_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Queue depth by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

/// A fetched page. Unique per `(target_id, url_path)`.
///
/// `last_visited_at` is bumped on every store; `last_updated_at` only when
/// the body changed (or the sitemap's `<lastmod>` said so).
#[derive(Debug, Clone, FromRow)]
pub struct Page {
    pub id: i64,
    pub target_id: i64,
    pub url_path: String,
    pub full_url: String,
    pub html_content: Option<String>,
    pub content_hash: Option<String>,
    pub http_status_code: Option<i64>,
    pub response_time_ms: Option<i64>,
    pub content_length: Option<i64>,
    pub last_visited_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// Fields for storing a fetched page.
#[derive(Debug, Clone)]
pub struct NewPage {
    pub target_id: i64,
    pub url_path: String,
    pub full_url: String,
    pub html_content: String,
    pub content_hash: String,
    pub http_status_code: i64,
    pub response_time_ms: i64,
    pub content_length: i64,
    /// Sitemap `<lastmod>` when provided, otherwise the store time.
    pub last_updated_at: DateTime<Utc>,
}

/// Stored classifier verdict for a page.
#[derive(Debug, Clone, FromRow)]
pub struct ClassifierRecord {
    pub id: i64,
    pub target_id: i64,
    pub url_path: String,
    pub decision_json: String,
    pub processable: bool,
    pub classified_at: DateTime<Utc>,
}
