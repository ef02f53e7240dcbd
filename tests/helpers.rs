// Shared test helpers for database setup and fixture data.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tempfile::TempDir;

use sitescraper::storage::{create_target, run_migrations, NewTarget, Target};

/// A file-backed test database. In-memory SQLite gives every pooled
/// connection its own blank database, so concurrent workers need a real
/// file; the TempDir keeps it alive for the test's duration.
pub struct TestDb {
    pub pool: Arc<SqlitePool>,
    _dir: TempDir,
}

#[allow(dead_code)] // shared across test binaries; not every binary uses every helper
pub async fn create_test_db() -> TestDb {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("scraper-test.db");
    std::fs::File::create(&db_path).expect("Failed to create db file");

    let pool = SqlitePool::connect(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    TestDb {
        pool: Arc::new(pool),
        _dir: dir,
    }
}

/// Creates an active target pointing at the given sitemap, with a high
/// request rate so tests do not sleep on the rate limiter.
#[allow(dead_code)]
pub async fn create_fast_target(
    pool: &SqlitePool,
    sitemap_url: Option<&str>,
    url_patterns: Option<&str>,
) -> Target {
    create_target(
        pool,
        &NewTarget {
            website_url: "https://example.com".to_string(),
            sitemap_url: sitemap_url.map(str::to_string),
            user_agent: Some("TestAgent/1.0".to_string()),
            requests_per_second: Some(200.0),
            url_patterns: url_patterns.map(str::to_string),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to create target")
}

/// Hex xxh64 of a body, matching the worker's content hashing.
#[allow(dead_code)]
pub fn content_hash(body: &str) -> String {
    format!("{:x}", xxhash_rust::xxh64::xxh64(body.as_bytes(), 0))
}

/// Inserts a page row with explicit timestamps, bypassing `save_page`'s
/// visited-at bump so change-detection fixtures can control both clocks.
#[allow(dead_code)]
pub async fn insert_page_fixture(
    pool: &SqlitePool,
    target_id: i64,
    url_path: &str,
    full_url: &str,
    body: &str,
    last_visited_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
) {
    sqlx::query(
        "INSERT INTO pages (target_id, url_path, full_url, html_content, content_hash, \
         http_status_code, response_time_ms, content_length, last_visited_at, last_updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 200, 100, ?6, ?7, ?8)",
    )
    .bind(target_id)
    .bind(url_path)
    .bind(full_url)
    .bind(body)
    .bind(content_hash(body))
    .bind(body.len() as i64)
    .bind(last_visited_at)
    .bind(last_updated_at)
    .execute(pool)
    .await
    .expect("Failed to insert page fixture");
}

/// Builds a urlset body from `(loc, lastmod)` pairs.
#[allow(dead_code)]
pub fn urlset_xml(entries: &[(&str, Option<&str>)]) -> String {
    let mut body = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">",
    );
    for (loc, lastmod) in entries {
        body.push_str("<url><loc>");
        body.push_str(loc);
        body.push_str("</loc>");
        if let Some(lastmod) = lastmod {
            body.push_str("<lastmod>");
            body.push_str(lastmod);
            body.push_str("</lastmod>");
        }
        body.push_str("</url>");
    }
    body.push_str("</urlset>");
    body
}
