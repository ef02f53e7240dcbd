//! Crawl orchestration: sitemap → queue → workers → reporter.
//!
//! A run resolves sitemaps into the durable queue, then drives a fixed-size
//! pool of workers that claim items, fetch under per-target rate limits,
//! consult the change detector, classify, and acknowledge. Workers push
//! results through a bounded channel to a single collector, coupling fetch
//! rate to collector throughput.

mod change;
mod reporter;

pub use change::{detect_change, ChangeDecision};
pub use reporter::ProgressReporter;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::warn;
use reqwest::header::USER_AGENT;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;
use xxhash_rust::xxh64::xxh64;

use crate::classifier;
use crate::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_REQUESTS_PER_SECOND, DEFAULT_USER_AGENT, DEFAULT_WORKERS,
    ENQUEUE_BATCH_SIZE, MAX_RETRIES, REQUEST_TIMEOUT, RETRY_DELAY,
};
use crate::error_handling::{classify_error, is_retryable_error};
use crate::limiter::RateLimiter;
use crate::sitemap::Resolver;
use crate::storage::{self, NewPage, QueueItem, Target};

/// Tunables for a runner instance.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub workers: usize,
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
        }
    }
}

/// Counters for a single run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    pub total_urls: usize,
    pub processed: usize,
    pub errors: usize,
    pub skipped: usize,
    /// Retry attempts recorded by the reporter (0 when progress is off).
    pub retries: usize,
}

/// A successfully handled queue item.
#[derive(Debug)]
struct FetchedPage {
    url: String,
    content_length: usize,
    response_time: Duration,
    decision: ChangeDecision,
}

/// One worker result pushed to the collector.
struct ScrapeResult {
    outcome: Result<FetchedPage, anyhow::Error>,
}

/// Shared state handed to every worker.
struct WorkerContext {
    pool: Arc<SqlitePool>,
    client: reqwest::Client,
    limiter: RateLimiter,
    reporter: Option<Arc<ProgressReporter>>,
    cancel: CancellationToken,
    /// URL → sitemap `<lastmod>`; consulted when storing a page.
    last_mods: HashMap<String, DateTime<Utc>>,
    max_retries: u32,
    retry_delay: Duration,
}

/// The crawl engine: glues resolver, queue, workers, and reporter together
/// for a single invocation.
pub struct ScraperRunner {
    pool: Arc<SqlitePool>,
    resolver: Resolver,
    client: reqwest::Client,
    options: RunnerOptions,
}

impl ScraperRunner {
    pub fn new(pool: Arc<SqlitePool>, options: RunnerOptions) -> anyhow::Result<Self> {
        let resolver = Resolver::new(Arc::clone(&pool))
            .context("failed to initialize sitemap resolver")?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to initialize HTTP client")?;
        Ok(Self {
            pool,
            resolver,
            client,
            options,
        })
    }

    /// Runs the crawl pipeline once.
    ///
    /// `target_id` restricts the run to a single target; `None` covers all
    /// active targets. Sitemap failures are logged per target and never
    /// abort the run; run-level store failures do.
    pub async fn run(
        &self,
        target_id: Option<i64>,
        show_progress: bool,
        verbose: bool,
        dry_run: bool,
        cancel: CancellationToken,
    ) -> anyhow::Result<RunStats> {
        let start_time = Instant::now();
        println!(
            "Starting scraper with {} workers, batch size {}",
            self.options.workers, self.options.batch_size
        );
        if dry_run {
            println!("DRY RUN MODE - No actual crawling will be performed");
        }

        // Phase 1: resolve the target set.
        let targets: Vec<Target> = match target_id {
            Some(id) => {
                let target = storage::get_target(self.pool.as_ref(), id)
                    .await
                    .with_context(|| format!("failed to get target {id}"))?;
                println!("Processing target: {}", target.website_url);
                vec![target]
            }
            None => {
                let targets = storage::list_active_targets(self.pool.as_ref())
                    .await
                    .context("failed to list active targets")?;
                println!("Processing {} active targets", targets.len());
                targets
            }
        };

        if targets.is_empty() {
            println!("No targets found to process");
            return Ok(RunStats::default());
        }

        // Phase 2: parse sitemaps into the queue.
        let mut new_urls = 0;
        for (i, target) in targets.iter().enumerate() {
            println!(
                "\n[{}/{}] Processing target: {}",
                i + 1,
                targets.len(),
                target.website_url
            );
            if target
                .sitemap_url
                .as_deref()
                .is_some_and(|s| !s.is_empty())
            {
                match self.parse_and_queue(target, dry_run).await {
                    Ok(count) => {
                        new_urls += count;
                        println!(
                            "Queued {count} new URLs from sitemap for target {}",
                            target.website_url
                        );
                    }
                    Err(e) => {
                        // Logged, not fatal: the queue may still hold work.
                        println!(
                            "Failed to parse sitemap for target {}: {e:#}",
                            target.website_url
                        );
                    }
                }
            } else {
                println!(
                    "No sitemap configured for target {}, will process existing queue items",
                    target.website_url
                );
            }
        }

        // Phase 3: inspect the queue.
        let queue_stats = storage::queue_stats(self.pool.as_ref())
            .await
            .context("failed to get queue statistics")?;
        println!("\nQueue Status:");
        println!("  - Pending: {}", queue_stats.pending);
        println!("  - Processing: {}", queue_stats.processing);
        println!("  - Completed: {}", queue_stats.completed);
        println!("  - Failed: {}", queue_stats.failed);

        let total_pending = queue_stats.pending.max(0) as usize;
        let mut stats = RunStats {
            total_urls: total_pending,
            ..RunStats::default()
        };

        if total_pending == 0 {
            println!("\nNo pending URLs found in queue.");
            if new_urls > 0 {
                println!("{new_urls} new URLs were discovered but not processed in dry-run mode.");
            }
            print_summary(&stats, start_time);
            return Ok(stats);
        }

        if dry_run {
            stats.processed = total_pending;
            println!("Dry run completed - would have processed {total_pending} URLs");
            print_summary(&stats, start_time);
            return Ok(stats);
        }

        // Phase 4: build the URL → <lastmod> lookup for storing decisions.
        let last_mods = self.build_lastmod_lookup().await?;

        // Phase 5: workers and collector.
        println!(
            "\nStarting {} workers to process {} pending URLs...",
            self.options.workers, total_pending
        );

        let reporter =
            show_progress.then(|| Arc::new(ProgressReporter::new(total_pending, verbose)));

        let ctx = Arc::new(WorkerContext {
            pool: Arc::clone(&self.pool),
            client: self.client.clone(),
            limiter: RateLimiter::new(),
            reporter: reporter.clone(),
            cancel,
            last_mods,
            max_retries: self.options.max_retries,
            retry_delay: self.options.retry_delay,
        });

        let (tx, mut rx) = mpsc::channel::<ScrapeResult>(self.options.batch_size.max(1));
        let mut workers = FuturesUnordered::new();
        for _ in 0..self.options.workers {
            workers.push(tokio::spawn(worker_loop(Arc::clone(&ctx), tx.clone())));
        }
        drop(tx);

        // Single collector: the only writer of run counters.
        while let Some(result) = rx.recv().await {
            match result.outcome {
                Ok(page) => {
                    if page.decision.is_skip() {
                        stats.skipped += 1;
                        if let Some(reporter) = &reporter {
                            reporter.log_info(&format!(
                                "Skipped {} ({})",
                                page.url,
                                page.decision.as_str()
                            ));
                        }
                    } else {
                        stats.processed += 1;
                        if let Some(reporter) = &reporter {
                            reporter.log_success(&format!(
                                "Scraped {} ({} bytes, {}ms)",
                                page.url,
                                page.content_length,
                                page.response_time.as_millis()
                            ));
                        }
                    }
                }
                Err(e) => {
                    stats.errors += 1;
                    if let Some(reporter) = &reporter {
                        reporter.record_error(classify_error(&e));
                        reporter.log_error(&format!("{e:#}"));
                    }
                }
            }
            if let Some(reporter) = &reporter {
                reporter.update_progress(stats.processed, stats.errors, stats.skipped);
            }
        }

        while let Some(task_result) = workers.next().await {
            if let Err(join_error) = task_result {
                stats.errors += 1;
                warn!("Worker task panicked: {join_error:?}");
            }
        }

        if let Some(reporter) = &reporter {
            stats.retries = reporter.retries();
            reporter.finish();
        }
        print_summary(&stats, start_time);
        Ok(stats)
    }

    /// Resolves a target's sitemap and enqueues the URLs (unless dry run).
    /// Returns the number of URLs queued (or discovered, in dry run).
    async fn parse_and_queue(&self, target: &Target, dry_run: bool) -> anyhow::Result<usize> {
        let resolved = self
            .resolver
            .resolve_for_target(target.id)
            .await
            .context("failed to parse sitemap")?;

        if resolved.urls.is_empty() {
            println!("No URLs found in sitemap");
            return Ok(0);
        }
        println!("Found {} URLs in sitemap", resolved.urls.len());

        if dry_run {
            return Ok(resolved.urls.len());
        }

        let urls: Vec<String> = resolved.urls.into_iter().map(|u| u.loc).collect();
        let queued = storage::batch_enqueue(self.pool.as_ref(), target.id, &urls, ENQUEUE_BATCH_SIZE)
            .await
            .context("failed to batch enqueue URLs")?;
        println!("Successfully queued {} out of {} URLs", queued, urls.len());

        storage::touch_last_visited(self.pool.as_ref(), target.id)
            .await
            .context("failed to update target last_visited_at")?;

        Ok(queued)
    }

    /// Re-resolves sitemaps of all active targets to build the
    /// URL → `<lastmod>` lookup workers consult when storing pages.
    async fn build_lastmod_lookup(&self) -> anyhow::Result<HashMap<String, DateTime<Utc>>> {
        let targets = storage::list_active_targets(self.pool.as_ref())
            .await
            .context("failed to list active targets")?;

        let mut last_mods = HashMap::new();
        for target in targets {
            if target.sitemap_url.as_deref().is_none_or(str::is_empty) {
                continue;
            }
            match self.resolver.resolve_for_target(target.id).await {
                Ok(resolved) => {
                    for entry in resolved.urls {
                        if let Some(lastmod) = entry.lastmod {
                            last_mods.insert(entry.loc, lastmod);
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to resolve sitemap for lastmod lookup (target {}): {e}",
                        target.id
                    );
                }
            }
        }
        Ok(last_mods)
    }
}

/// Worker loop: claim, fetch, report, acknowledge. Terminates when the
/// queue is drained or the run is cancelled.
async fn worker_loop(ctx: Arc<WorkerContext>, tx: mpsc::Sender<ScrapeResult>) {
    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let item = match storage::dequeue_pending(ctx.pool.as_ref()).await {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(e) => {
                let error = anyhow::Error::new(e).context("failed to dequeue URL");
                if tx.send(ScrapeResult { outcome: Err(error) }).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let result = scrape_with_retries(&ctx, &item).await;
        let error_message = result
            .outcome
            .as_ref()
            .err()
            .map(|e| format!("{e:#}"));

        // Send before acknowledging: a full channel blocks the worker here,
        // coupling fetch rate to collector throughput.
        let _ = tx.send(result).await;

        match error_message {
            Some(message) => {
                if let Err(e) = storage::fail_item(ctx.pool.as_ref(), item.id, &message).await {
                    warn!("Failed to mark queue item {} as failed: {e}", item.id);
                }
            }
            None => {
                if let Err(e) = storage::complete_item(ctx.pool.as_ref(), item.id).await {
                    warn!("Failed to mark queue item {} as complete: {e}", item.id);
                }
            }
        }
    }
}

/// Fetches one queue item with linear-backoff retries.
///
/// Retryable failures sleep `attempt * retry_delay` before the next try and
/// count toward the reporter's retry total. Non-retryable failures break
/// immediately; exhaustion wraps the last error.
async fn scrape_with_retries(ctx: &WorkerContext, item: &QueueItem) -> ScrapeResult {
    let mut last_error: Option<anyhow::Error> = None;

    for attempt in 0..=ctx.max_retries {
        if attempt > 0 {
            tokio::time::sleep(ctx.retry_delay * attempt).await;
        }

        match scrape_attempt(ctx, item).await {
            Ok(page) => {
                return ScrapeResult { outcome: Ok(page) };
            }
            Err(e) => {
                let retryable = is_retryable_error(&e);
                if !retryable {
                    return ScrapeResult { outcome: Err(e) };
                }
                if attempt < ctx.max_retries {
                    if let Some(reporter) = &ctx.reporter {
                        reporter.increment_retries();
                    }
                    warn!(
                        "Retrying {} (attempt {}/{}): {e:#}",
                        item.url,
                        attempt + 1,
                        ctx.max_retries
                    );
                }
                last_error = Some(e);
            }
        }
    }

    let last = last_error.expect("exhausted retries always record an error");
    ScrapeResult {
        outcome: Err(anyhow::anyhow!(
            "failed after {} retries: {last:#}",
            ctx.max_retries
        )),
    }
}

/// A single fetch attempt: rate-limit, GET, hash, change-detect, store,
/// classify.
async fn scrape_attempt(ctx: &WorkerContext, item: &QueueItem) -> anyhow::Result<FetchedPage> {
    let start = Instant::now();

    let target = storage::get_target(ctx.pool.as_ref(), item.target_id)
        .await
        .context("failed to get target")?;

    let user_agent = target
        .user_agent
        .clone()
        .filter(|ua| !ua.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
    let rate = target
        .requests_per_second
        .filter(|r| *r > 0.0)
        .unwrap_or(DEFAULT_REQUESTS_PER_SECOND);

    ctx.limiter.wait(item.target_id, rate).await;

    let response = tokio::select! {
        _ = ctx.cancel.cancelled() => anyhow::bail!("run cancelled"),
        result = ctx
            .client
            .get(&item.url)
            .header(USER_AGENT, user_agent.as_str())
            .send() => result.context("HTTP request failed")?,
    };

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status")
        );
    }

    let body = response
        .bytes()
        .await
        .context("failed to read response body")?;
    let response_time = start.elapsed();
    let content = String::from_utf8_lossy(&body).into_owned();
    let content_hash = format!("{:x}", xxh64(&body, 0));
    let url_path = page_path(&item.url);

    let stored = storage::get_page_by_path(ctx.pool.as_ref(), item.target_id, &url_path)
        .await
        .context("failed to load stored page")?;
    let decision = detect_change(stored.as_ref(), &content_hash);

    if decision == ChangeDecision::Store {
        let last_updated_at = ctx
            .last_mods
            .get(&item.url)
            .copied()
            .unwrap_or_else(Utc::now);
        storage::save_page(
            ctx.pool.as_ref(),
            &NewPage {
                target_id: item.target_id,
                url_path: url_path.clone(),
                full_url: item.url.clone(),
                html_content: content.clone(),
                content_hash,
                http_status_code: i64::from(status.as_u16()),
                response_time_ms: response_time.as_millis() as i64,
                content_length: content.len() as i64,
                last_updated_at,
            },
        )
        .await
        .context("failed to save page")?;
    }

    // Classify on every successful fetch; the record upserts so repeated
    // visits converge to the same verdict.
    let verdict = classifier::classify_page(&item.url, &content);
    let decision_json = verdict
        .to_json()
        .context("failed to serialize classifier verdict")?;
    storage::save_page_classifier(
        ctx.pool.as_ref(),
        item.target_id,
        &url_path,
        &decision_json,
        verdict.decision.processable,
        Utc::now(),
    )
    .await
    .context("failed to save classifier record")?;

    Ok(FetchedPage {
        url: item.url.clone(),
        content_length: content.len(),
        response_time,
        decision,
    })
}

/// Derives the per-target page key: the URL's path component, `/` when
/// empty. Unparseable URLs fall back to the raw string as an opaque key.
fn page_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let path = parsed.path();
            if path.is_empty() {
                "/".to_string()
            } else {
                path.to_string()
            }
        }
        Err(_) => url.to_string(),
    }
}

fn print_summary(stats: &RunStats, start_time: Instant) {
    let elapsed = start_time.elapsed();
    let separator = "=".repeat(50);
    println!("\n{separator}");
    println!("SCRAPING SUMMARY");
    println!("{separator}");
    println!("Total time: {}s", elapsed.as_secs());
    println!("Total URLs: {}", stats.total_urls);
    println!("Processed: {}", stats.processed);
    println!("Errors: {}", stats.errors);
    println!("Skipped: {}", stats.skipped);

    if stats.processed > 0 && elapsed.as_secs_f64() > 0.0 {
        println!(
            "Average rate: {:.2} URLs/second",
            stats.processed as f64 / elapsed.as_secs_f64()
        );
    }
    if stats.total_urls > 0 {
        println!(
            "Success rate: {:.1}%",
            stats.processed as f64 / stats.total_urls as f64 * 100.0
        );
    }
    println!("{separator}");
}
