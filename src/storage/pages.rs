//! Page and classifier-record persistence.
//!
//! Pages are unique per `(target_id, url_path)`; storing an already-known
//! path upserts the row, bumping `last_visited_at` every time and taking
//! `last_updated_at` from the caller (sitemap `<lastmod>` or store time).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error_handling::StorageError;
use crate::storage::models::{ClassifierRecord, NewPage, Page};

const PAGE_COLUMNS: &str = "id, target_id, url_path, full_url, html_content, content_hash, \
     http_status_code, response_time_ms, content_length, last_visited_at, last_updated_at";

/// Stores a fetched page, inserting or replacing on `(target_id, url_path)`.
pub async fn save_page(pool: &SqlitePool, page: &NewPage) -> Result<Page, StorageError> {
    let now = Utc::now();
    let stored = sqlx::query_as::<_, Page>(&format!(
        "INSERT INTO pages (target_id, url_path, full_url, html_content, content_hash, \
         http_status_code, response_time_ms, content_length, last_visited_at, last_updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
         ON CONFLICT (target_id, url_path) DO UPDATE SET \
             full_url = excluded.full_url, \
             html_content = excluded.html_content, \
             content_hash = excluded.content_hash, \
             http_status_code = excluded.http_status_code, \
             response_time_ms = excluded.response_time_ms, \
             content_length = excluded.content_length, \
             last_visited_at = excluded.last_visited_at, \
             last_updated_at = excluded.last_updated_at \
         RETURNING {PAGE_COLUMNS}"
    ))
    .bind(page.target_id)
    .bind(&page.url_path)
    .bind(&page.full_url)
    .bind(&page.html_content)
    .bind(&page.content_hash)
    .bind(page.http_status_code)
    .bind(page.response_time_ms)
    .bind(page.content_length)
    .bind(now)
    .bind(page.last_updated_at)
    .fetch_one(pool)
    .await?;
    Ok(stored)
}

/// Looks up the stored page for a `(target_id, url_path)` pair.
pub async fn get_page_by_path(
    pool: &SqlitePool,
    target_id: i64,
    url_path: &str,
) -> Result<Option<Page>, StorageError> {
    let page = sqlx::query_as::<_, Page>(&format!(
        "SELECT {PAGE_COLUMNS} FROM pages WHERE target_id = ?1 AND url_path = ?2"
    ))
    .bind(target_id)
    .bind(url_path)
    .fetch_optional(pool)
    .await?;
    Ok(page)
}

/// Upserts the classifier verdict for a page.
pub async fn save_page_classifier(
    pool: &SqlitePool,
    target_id: i64,
    url_path: &str,
    decision_json: &str,
    processable: bool,
    classified_at: DateTime<Utc>,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO classifier_records (target_id, url_path, decision_json, processable, classified_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (target_id, url_path) DO UPDATE SET \
             decision_json = excluded.decision_json, \
             processable = excluded.processable, \
             classified_at = excluded.classified_at",
    )
    .bind(target_id)
    .bind(url_path)
    .bind(decision_json)
    .bind(processable)
    .bind(classified_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Looks up the stored classifier verdict for a page.
pub async fn get_page_classifier(
    pool: &SqlitePool,
    target_id: i64,
    url_path: &str,
) -> Result<Option<ClassifierRecord>, StorageError> {
    let record = sqlx::query_as::<_, ClassifierRecord>(
        "SELECT id, target_id, url_path, decision_json, processable, classified_at \
         FROM classifier_records WHERE target_id = ?1 AND url_path = ?2",
    )
    .bind(target_id)
    .bind(url_path)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}
