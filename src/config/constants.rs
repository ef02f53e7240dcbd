//! Configuration constants.
//!
//! Defaults for the crawl pipeline: HTTP behavior, worker pool sizing,
//! batching, and the retry policy.

use std::time::Duration;

/// User-Agent sent when a target has none configured.
pub const DEFAULT_USER_AGENT: &str = "ScraperBot/1.0";

/// Per-request HTTP client timeout. Applies to both page fetches and
/// sitemap fetches.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of concurrent workers.
pub const DEFAULT_WORKERS: usize = 3;
/// Worker count bounds enforced by the CLI.
pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 20;

/// Default result-channel capacity (CLI `--batch-size`).
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Batch size bounds enforced by the CLI.
pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 100;

/// Sub-batch size for transactional queue inserts during sitemap enqueue.
pub const ENQUEUE_BATCH_SIZE: usize = 50;

/// Maximum number of retries after the initial fetch attempt.
pub const MAX_RETRIES: u32 = 3;
/// Base delay for linear retry backoff (`attempt * RETRY_DELAY`).
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Requests per second applied when a target has no rate configured
/// (or a non-positive one).
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 1.0;

/// Paths probed during sitemap auto-discovery, in order. The first 200 on a
/// non-robots path wins; robots.txt hits are ignored for extraction.
pub const SITEMAP_DISCOVERY_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap.txt",
    "/robots.txt",
];

/// Environment variable holding the SQLite database path.
pub const ENV_DB_PATH: &str = "SCRAPER_DB_PATH";
/// Environment variable holding the admin UI port.
pub const ENV_PORT: &str = "SCRAPER_PORT";
