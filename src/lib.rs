//! sitescraper library: persistent, resumable sitemap-driven crawling.
//!
//! Given a set of configured targets (a website root plus optional sitemap
//! URL and per-target policy), this library discovers page URLs from XML
//! sitemaps, drives them through a durable work queue, fetches each page
//! under per-target rate limits, detects whether content has meaningfully
//! changed since the last visit, and runs a structural classifier to decide
//! whether the page is worth further processing.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sitescraper::runner::{RunnerOptions, ScraperRunner};
//! use sitescraper::storage::{init_db_pool_with_path, run_migrations};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = init_db_pool_with_path(std::path::Path::new("scraper.db")).await?;
//! run_migrations(&pool).await?;
//!
//! let runner = ScraperRunner::new(Arc::clone(&pool), RunnerOptions::default())?;
//! let stats = runner
//!     .run(None, true, false, false, CancellationToken::new())
//!     .await?;
//! println!("processed {} URLs", stats.processed);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod error_handling;
pub mod limiter;
pub mod logging;
pub mod runner;
pub mod sitemap;
pub mod storage;

pub use config::{load_env, Env};
pub use runner::{RunnerOptions, RunStats, ScraperRunner};
pub use storage::{init_db_pool_with_path, run_migrations};
