//! Target CRUD operations.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error_handling::StorageError;
use crate::storage::models::{NewTarget, Target};

const TARGET_COLUMNS: &str = "id, website_url, sitemap_url, user_agent, requests_per_second, \
     sitemap_patterns, url_patterns, is_active, created_at, updated_at, last_visited_at";

/// Creates a new active target and returns the stored row.
pub async fn create_target(pool: &SqlitePool, new: &NewTarget) -> Result<Target, StorageError> {
    let now = Utc::now();
    let target = sqlx::query_as::<_, Target>(&format!(
        "INSERT INTO targets (website_url, sitemap_url, user_agent, requests_per_second, \
         sitemap_patterns, url_patterns, is_active, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7) \
         RETURNING {TARGET_COLUMNS}"
    ))
    .bind(&new.website_url)
    .bind(&new.sitemap_url)
    .bind(&new.user_agent)
    .bind(new.requests_per_second)
    .bind(&new.sitemap_patterns)
    .bind(&new.url_patterns)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(target)
}

/// Looks up a target by id.
///
/// # Errors
///
/// Returns `StorageError::TargetNotFound` when no row exists.
pub async fn get_target(pool: &SqlitePool, id: i64) -> Result<Target, StorageError> {
    sqlx::query_as::<_, Target>(&format!(
        "SELECT {TARGET_COLUMNS} FROM targets WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(StorageError::TargetNotFound(id))
}

/// Lists targets with `is_active = true`, oldest first.
pub async fn list_active_targets(pool: &SqlitePool) -> Result<Vec<Target>, StorageError> {
    let targets = sqlx::query_as::<_, Target>(&format!(
        "SELECT {TARGET_COLUMNS} FROM targets WHERE is_active = 1 ORDER BY id ASC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(targets)
}

/// Lists every target, active or not, oldest first.
pub async fn list_all_targets(pool: &SqlitePool) -> Result<Vec<Target>, StorageError> {
    let targets = sqlx::query_as::<_, Target>(&format!(
        "SELECT {TARGET_COLUMNS} FROM targets ORDER BY id ASC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(targets)
}

/// Soft-deletes a target. Historical pages and logs keep referencing it.
pub async fn deactivate_target(pool: &SqlitePool, id: i64) -> Result<(), StorageError> {
    let result = sqlx::query("UPDATE targets SET is_active = 0, updated_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::TargetNotFound(id));
    }
    Ok(())
}

/// Bumps a target's `last_visited_at` to now.
pub async fn touch_last_visited(pool: &SqlitePool, id: i64) -> Result<(), StorageError> {
    sqlx::query("UPDATE targets SET last_visited_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
