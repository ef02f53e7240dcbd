//! Durable work queue operations.
//!
//! Lifecycle: `pending → processing → {completed | failed}`, with
//! `failed → pending` on explicit retry. Claiming is a single atomic
//! `UPDATE ... RETURNING`, so concurrent workers never receive the same
//! item. Duplicate `(target_id, url)` rows are allowed; the change detector
//! absorbs them at fetch time.

use chrono::Utc;
use log::warn;
use sqlx::SqlitePool;

use crate::error_handling::StorageError;
use crate::storage::models::{QueueItem, QueueStats};

const QUEUE_COLUMNS: &str =
    "id, target_id, url, priority, status, error_message, attempt_count, created_at, updated_at";

/// Inserts a new pending queue item.
pub async fn enqueue_url(
    pool: &SqlitePool,
    target_id: i64,
    url: &str,
    priority: i64,
) -> Result<i64, StorageError> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO queue (target_id, url, priority, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, 'pending', ?4, ?4)",
    )
    .bind(target_id)
    .bind(url)
    .bind(priority)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Enqueues URLs in transactional sub-batches.
///
/// Each sub-batch of `batch_size` URLs commits as one transaction. A
/// failing URL inside a batch is logged and skipped; the rest of the batch
/// still commits. Returns the number of URLs actually inserted.
pub async fn batch_enqueue(
    pool: &SqlitePool,
    target_id: i64,
    urls: &[String],
    batch_size: usize,
) -> Result<usize, StorageError> {
    let mut queued = 0;
    for chunk in urls.chunks(batch_size.max(1)) {
        let mut tx = pool.begin().await?;
        let now = Utc::now();
        for url in chunk {
            let inserted = sqlx::query(
                "INSERT INTO queue (target_id, url, priority, status, created_at, updated_at) \
                 VALUES (?1, ?2, 0, 'pending', ?3, ?3)",
            )
            .bind(target_id)
            .bind(url)
            .bind(now)
            .execute(&mut *tx)
            .await;
            match inserted {
                Ok(_) => queued += 1,
                Err(e) => warn!("Failed to queue URL {url}: {e}"),
            }
        }
        tx.commit().await?;
    }
    Ok(queued)
}

/// Atomically claims the next pending item and marks it `processing`.
///
/// Claim order is `priority DESC, id ASC`. Returns `Ok(None)` when the
/// queue holds no pending items, which is the worker termination signal.
pub async fn dequeue_pending(pool: &SqlitePool) -> Result<Option<QueueItem>, StorageError> {
    let item = sqlx::query_as::<_, QueueItem>(&format!(
        "UPDATE queue \
         SET status = 'processing', attempt_count = attempt_count + 1, updated_at = ?1 \
         WHERE id = ( \
             SELECT id FROM queue WHERE status = 'pending' \
             ORDER BY priority DESC, id ASC LIMIT 1 \
         ) \
         RETURNING {QUEUE_COLUMNS}"
    ))
    .bind(Utc::now())
    .fetch_optional(pool)
    .await?;
    Ok(item)
}

/// Marks a processing item as completed.
pub async fn complete_item(pool: &SqlitePool, id: i64) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE queue SET status = 'completed', updated_at = ?1 \
         WHERE id = ?2 AND status = 'processing'",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Marks a processing item as failed with the given message.
pub async fn fail_item(pool: &SqlitePool, id: i64, error_message: &str) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE queue SET status = 'failed', error_message = ?1, updated_at = ?2 \
         WHERE id = ?3 AND status = 'processing'",
    )
    .bind(error_message)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns a failed item to the pending state and clears its error.
pub async fn retry_item(pool: &SqlitePool, id: i64) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE queue SET status = 'pending', error_message = NULL, updated_at = ?1 \
         WHERE id = ?2 AND status = 'failed'",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Counts queue items by status.
pub async fn queue_stats(pool: &SqlitePool) -> Result<QueueStats, StorageError> {
    let (pending, processing, completed, failed) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
        "SELECT \
             COALESCE(SUM(status = 'pending'), 0), \
             COALESCE(SUM(status = 'processing'), 0), \
             COALESCE(SUM(status = 'completed'), 0), \
             COALESCE(SUM(status = 'failed'), 0) \
         FROM queue",
    )
    .fetch_one(pool)
    .await?;
    Ok(QueueStats {
        pending,
        processing,
        completed,
        failed,
    })
}

/// Deletes all queue items. Returns the number of rows removed.
pub async fn purge_queue(pool: &SqlitePool) -> Result<u64, StorageError> {
    let result = sqlx::query("DELETE FROM queue").execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{NewTarget, QueueStatus};
    use crate::storage::{create_target, run_migrations};

    async fn pool_with_target() -> (SqlitePool, i64) {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool");
        run_migrations(&pool).await.expect("migrations failed");
        let target = create_target(
            &pool,
            &NewTarget {
                website_url: "https://example.com".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("target creation failed");
        (pool, target.id)
    }

    #[tokio::test]
    async fn test_enqueue_and_dequeue() {
        let (pool, target_id) = pool_with_target().await;
        enqueue_url(&pool, target_id, "https://example.com/a", 0)
            .await
            .unwrap();

        let item = dequeue_pending(&pool).await.unwrap().expect("item");
        assert_eq!(item.url, "https://example.com/a");
        assert_eq!(item.status, QueueStatus::Processing);
        assert_eq!(item.attempt_count, 1);

        // Queue is drained now.
        assert!(dequeue_pending(&pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dequeue_order_priority_then_id() {
        let (pool, target_id) = pool_with_target().await;
        enqueue_url(&pool, target_id, "https://example.com/low", 0)
            .await
            .unwrap();
        enqueue_url(&pool, target_id, "https://example.com/high", 5)
            .await
            .unwrap();
        enqueue_url(&pool, target_id, "https://example.com/low2", 0)
            .await
            .unwrap();

        let first = dequeue_pending(&pool).await.unwrap().unwrap();
        assert_eq!(first.url, "https://example.com/high");
        let second = dequeue_pending(&pool).await.unwrap().unwrap();
        assert_eq!(second.url, "https://example.com/low");
        let third = dequeue_pending(&pool).await.unwrap().unwrap();
        assert_eq!(third.url, "https://example.com/low2");
    }

    #[tokio::test]
    async fn test_complete_and_fail_transitions() {
        let (pool, target_id) = pool_with_target().await;
        enqueue_url(&pool, target_id, "https://example.com/a", 0)
            .await
            .unwrap();
        enqueue_url(&pool, target_id, "https://example.com/b", 0)
            .await
            .unwrap();

        let a = dequeue_pending(&pool).await.unwrap().unwrap();
        let b = dequeue_pending(&pool).await.unwrap().unwrap();

        complete_item(&pool, a.id).await.unwrap();
        fail_item(&pool, b.id, "HTTP 500: Internal Server Error")
            .await
            .unwrap();

        let stats = queue_stats(&pool).await.unwrap();
        assert_eq!(
            stats,
            QueueStats {
                pending: 0,
                processing: 0,
                completed: 1,
                failed: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_complete_requires_processing_state() {
        let (pool, target_id) = pool_with_target().await;
        let id = enqueue_url(&pool, target_id, "https://example.com/a", 0)
            .await
            .unwrap();

        // Item is still pending: complete must not transition it.
        complete_item(&pool, id).await.unwrap();
        let stats = queue_stats(&pool).await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completed, 0);
    }

    #[tokio::test]
    async fn test_retry_returns_failed_to_pending() {
        let (pool, target_id) = pool_with_target().await;
        enqueue_url(&pool, target_id, "https://example.com/a", 0)
            .await
            .unwrap();
        let item = dequeue_pending(&pool).await.unwrap().unwrap();
        fail_item(&pool, item.id, "timeout").await.unwrap();

        retry_item(&pool, item.id).await.unwrap();

        let retried = dequeue_pending(&pool).await.unwrap().unwrap();
        assert_eq!(retried.id, item.id);
        assert!(retried.error_message.is_none());
        assert_eq!(retried.attempt_count, 2);
    }

    #[tokio::test]
    async fn test_retry_only_applies_to_failed() {
        let (pool, target_id) = pool_with_target().await;
        enqueue_url(&pool, target_id, "https://example.com/a", 0)
            .await
            .unwrap();
        let item = dequeue_pending(&pool).await.unwrap().unwrap();
        complete_item(&pool, item.id).await.unwrap();

        // Completed items never move backward.
        retry_item(&pool, item.id).await.unwrap();
        let stats = queue_stats(&pool).await.unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_batch_enqueue_counts_inserts() {
        let (pool, target_id) = pool_with_target().await;
        let urls: Vec<String> = (0..7)
            .map(|i| format!("https://example.com/p{i}"))
            .collect();
        let queued = batch_enqueue(&pool, target_id, &urls, 3).await.unwrap();
        assert_eq!(queued, 7);

        let stats = queue_stats(&pool).await.unwrap();
        assert_eq!(stats.pending, 7);
    }

    #[tokio::test]
    async fn test_duplicate_urls_both_enqueue() {
        // Uniqueness is intentionally not enforced at insert.
        let (pool, target_id) = pool_with_target().await;
        enqueue_url(&pool, target_id, "https://example.com/same", 0)
            .await
            .unwrap();
        enqueue_url(&pool, target_id, "https://example.com/same", 0)
            .await
            .unwrap();
        let stats = queue_stats(&pool).await.unwrap();
        assert_eq!(stats.pending, 2);
    }

    #[tokio::test]
    async fn test_purge_queue() {
        let (pool, target_id) = pool_with_target().await;
        enqueue_url(&pool, target_id, "https://example.com/a", 0)
            .await
            .unwrap();
        enqueue_url(&pool, target_id, "https://example.com/b", 0)
            .await
            .unwrap();
        let removed = purge_queue(&pool).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(queue_stats(&pool).await.unwrap(), QueueStats::default());
    }
}
