//! Durable store: SQLite via sqlx.
//!
//! The store owns all durable state: targets, the work queue, fetched
//! pages, classifier verdicts, and persisted logs. In-memory components
//! (workers, rate limiter, progress reporter) never cache rows across
//! iterations; every lookup goes back to the pool.

mod logs;
mod migrations;
mod models;
mod pages;
mod pool;
mod queue;
mod targets;

pub use logs::{DbLogger, LogLevel};
pub use migrations::run_migrations;
pub use models::{
    ClassifierRecord, NewPage, NewTarget, Page, QueueItem, QueueStats, QueueStatus, Target,
};
pub use pages::{get_page_by_path, get_page_classifier, save_page, save_page_classifier};
pub use pool::init_db_pool_with_path;
pub use queue::{
    batch_enqueue, complete_item, dequeue_pending, enqueue_url, fail_item, purge_queue,
    queue_stats, retry_item,
};
pub use targets::{
    create_target, deactivate_target, get_target, list_active_targets, list_all_targets,
    touch_last_visited,
};
