//! Administrative CLI for the sitescraper crawl engine.
//!
//! A thin shell over the library: every verb resolves to library calls so
//! behavior stays testable outside the binary.

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use sitescraper::config::{
    load_env, LogFormat, LogLevel, DEFAULT_BATCH_SIZE, DEFAULT_USER_AGENT, DEFAULT_WORKERS,
    MAX_BATCH_SIZE, MAX_WORKERS, MIN_BATCH_SIZE, MIN_WORKERS, REQUEST_TIMEOUT,
};
use sitescraper::logging::init_logger_with;
use sitescraper::runner::{RunnerOptions, ScraperRunner};
use sitescraper::sitemap::{auto_discover_sitemap, parse_sitemap_url, validate_sitemap};
use sitescraper::storage::{self, init_db_pool_with_path, run_migrations, NewTarget, Target};

#[derive(Parser, Debug)]
#[command(name = "scraper-cli", version, about = "Sitemap-driven web scraper")]
struct Cli {
    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a new crawl target
    Add {
        /// Website root URL
        #[arg(long)]
        url: String,
        /// Sitemap URL (skipped when auto-discovery is requested)
        #[arg(long)]
        sitemap: Option<String>,
        /// Probe common sitemap locations when none is given
        #[arg(long)]
        auto_discover: bool,
        /// Check the sitemap answers 200 before saving
        #[arg(long)]
        validate: bool,
        /// Per-target User-Agent header
        #[arg(long)]
        user_agent: Option<String>,
    },
    /// List configured targets
    List {
        /// Only active targets
        #[arg(long)]
        active: bool,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Show one target in detail
    Show {
        #[arg(long)]
        id: i64,
    },
    /// Deactivate a target (soft delete)
    Remove {
        #[arg(long)]
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Validate a sitemap configuration and preview its URLs
    Validate {
        /// Existing target ID to inspect
        #[arg(long)]
        id: Option<i64>,
        /// Website URL to validate instead
        #[arg(long)]
        url: Option<String>,
        /// Sitemap URL to preview
        #[arg(long)]
        sitemap: Option<String>,
        /// Probe common sitemap locations
        #[arg(long)]
        auto_discover: bool,
        /// Maximum URLs to preview
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Run the crawl pipeline
    Run {
        /// Restrict to one target (all active targets otherwise)
        #[arg(long)]
        target_id: Option<i64>,
        /// Number of concurrent workers
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
        /// Result channel capacity
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Show the progress line
        #[arg(long)]
        progress: bool,
        /// Verbose per-URL output
        #[arg(long)]
        verbose: bool,
        /// Resolve sitemaps without queueing or fetching
        #[arg(long)]
        dry_run: bool,
    },
    /// Queue operations
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
}

#[derive(Subcommand, Debug)]
enum QueueAction {
    /// Show queue status summary
    Status,
    /// Delete all queue items
    Purge,
}

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let env = load_env().context("Failed to load environment")?;

    let pool = init_db_pool_with_path(&env.db_path)
        .await
        .context("Failed to initialize database pool")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    match cli.command {
        Command::Add {
            url,
            sitemap,
            auto_discover,
            validate,
            user_agent,
        } => add_target(&pool, url, sitemap, auto_discover, validate, user_agent).await,
        Command::List { active, format } => list_targets(&pool, active, format).await,
        Command::Show { id } => show_target(&pool, id).await,
        Command::Remove { id, force } => remove_target(&pool, id, force).await,
        Command::Validate {
            id,
            url,
            sitemap,
            auto_discover,
            limit,
        } => validate_target(&pool, id, url, sitemap, auto_discover, limit).await,
        Command::Run {
            target_id,
            workers,
            batch_size,
            progress,
            verbose,
            dry_run,
        } => {
            run_scraper(
                Arc::clone(&pool),
                target_id,
                workers,
                batch_size,
                progress,
                verbose,
                dry_run,
            )
            .await
        }
        Command::Queue { action } => match action {
            QueueAction::Status => queue_status(&pool).await,
            QueueAction::Purge => queue_purge(&pool).await,
        },
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

async fn add_target(
    pool: &SqlitePool,
    url: String,
    sitemap: Option<String>,
    auto_discover: bool,
    validate: bool,
    user_agent: Option<String>,
) -> Result<()> {
    println!("Adding target: {url}");
    let client = http_client()?;

    let mut sitemap_url = sitemap;
    if sitemap_url.is_none() && auto_discover {
        let discovered = auto_discover_sitemap(&client, &url)
            .await
            .context("failed to discover sitemap")?;
        println!("Auto-discovered sitemap: {discovered}");
        sitemap_url = Some(discovered);
    }

    if validate {
        if let Some(sitemap_url) = &sitemap_url {
            let ua = user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
            validate_sitemap(&client, sitemap_url, ua)
                .await
                .context("sitemap validation failed")?;
            println!("Sitemap validation passed");
        }
    }

    let target = storage::create_target(
        pool,
        &NewTarget {
            website_url: url,
            sitemap_url,
            user_agent,
            ..Default::default()
        },
    )
    .await
    .context("failed to create target")?;

    println!("Target created successfully with ID: {}", target.id);
    Ok(())
}

async fn list_targets(pool: &SqlitePool, active_only: bool, format: OutputFormat) -> Result<()> {
    let targets = if active_only {
        storage::list_active_targets(pool).await?
    } else {
        storage::list_all_targets(pool).await?
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&targets)?);
        }
        OutputFormat::Table => {
            println!(
                "{:<5} {:<40} {:<40} {:<8} {}",
                "ID", "Website", "Sitemap", "Active", "Last Visited"
            );
            for target in &targets {
                println!(
                    "{:<5} {:<40} {:<40} {:<8} {}",
                    target.id,
                    target.website_url,
                    target.sitemap_url.as_deref().unwrap_or("-"),
                    target.is_active,
                    target
                        .last_visited_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
        }
    }
    Ok(())
}

fn print_target(target: &Target) {
    println!("Target ID: {}", target.id);
    println!("Website URL: {}", target.website_url);
    println!(
        "Sitemap URL: {}",
        target.sitemap_url.as_deref().unwrap_or("-")
    );
    println!("Active: {}", target.is_active);
    println!("Created: {}", target.created_at.to_rfc3339());
    println!("Updated: {}", target.updated_at.to_rfc3339());
    if let Some(last_visited) = target.last_visited_at {
        println!("Last Visited: {}", last_visited.to_rfc3339());
    }
    if let Some(user_agent) = &target.user_agent {
        println!("User Agent: {user_agent}");
    }
    if let Some(rate) = target.requests_per_second {
        println!("Requests/second: {rate}");
    }
}

async fn show_target(pool: &SqlitePool, id: i64) -> Result<()> {
    let target = storage::get_target(pool, id)
        .await
        .context("failed to get target")?;
    print_target(&target);
    Ok(())
}

async fn remove_target(pool: &SqlitePool, id: i64, force: bool) -> Result<()> {
    let target = storage::get_target(pool, id)
        .await
        .context("failed to get target")?;

    if !force {
        print!(
            "Are you sure you want to remove target {id} ({})? [y/N]: ",
            target.website_url
        );
        std::io::stdout().flush().ok();
        let mut response = String::new();
        std::io::stdin()
            .read_line(&mut response)
            .context("failed to read input")?;
        let response = response.trim().to_lowercase();
        if response != "y" && response != "yes" {
            println!("Removal cancelled.");
            return Ok(());
        }
    }

    storage::deactivate_target(pool, id)
        .await
        .context("failed to deactivate target")?;
    println!("Target {id} ({}) has been deactivated", target.website_url);
    Ok(())
}

async fn validate_target(
    pool: &SqlitePool,
    id: Option<i64>,
    url: Option<String>,
    sitemap: Option<String>,
    auto_discover: bool,
    limit: usize,
) -> Result<()> {
    if let Some(id) = id {
        let target = storage::get_target(pool, id)
            .await
            .context("failed to get target")?;
        print_target(&target);
        return Ok(());
    }

    let Some(url) = url else {
        bail!("either --id or --url must be specified");
    };

    println!("Validating configuration for: {url}");
    let client = http_client()?;

    let mut sitemap_url = sitemap;
    if sitemap_url.is_none() && auto_discover {
        let discovered = auto_discover_sitemap(&client, &url).await?;
        println!("Auto-discovered sitemap: {discovered}");
        sitemap_url = Some(discovered);
    }

    if let Some(sitemap_url) = sitemap_url {
        println!("Validating sitemap: {sitemap_url}");
        let entries = parse_sitemap_url(&client, &sitemap_url, DEFAULT_USER_AGENT)
            .await
            .context("failed to parse sitemap")?;
        println!(
            "Found {} URLs in sitemap. Previewing up to {limit}:",
            entries.len()
        );
        for entry in entries.iter().take(limit) {
            match entry.lastmod {
                Some(lastmod) => {
                    println!("- {} (lastmod: {})", entry.loc, lastmod.format("%Y-%m-%d"))
                }
                None => println!("- {}", entry.loc),
            }
        }
    }

    println!("Preview limit: {limit} URLs");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_scraper(
    pool: Arc<SqlitePool>,
    target_id: Option<i64>,
    workers: usize,
    batch_size: usize,
    progress: bool,
    verbose: bool,
    dry_run: bool,
) -> Result<()> {
    if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
        bail!("workers must be between {MIN_WORKERS} and {MAX_WORKERS}");
    }
    if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&batch_size) {
        bail!("batch-size must be between {MIN_BATCH_SIZE} and {MAX_BATCH_SIZE}");
    }

    let runner = ScraperRunner::new(
        pool,
        RunnerOptions {
            workers,
            batch_size,
            ..Default::default()
        },
    )
    .context("failed to initialize scraper runner")?;

    let cancel = CancellationToken::new();
    let cancel_on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping new dequeues...");
            cancel_on_interrupt.cancel();
        }
    });

    runner
        .run(target_id, progress, verbose, dry_run, cancel)
        .await?;
    Ok(())
}

async fn queue_status(pool: &SqlitePool) -> Result<()> {
    let stats = storage::queue_stats(pool).await?;
    println!("Status      Count");
    println!("----------- -----");
    println!("{:<11} {:>5}", "pending", stats.pending);
    println!("{:<11} {:>5}", "processing", stats.processing);
    println!("{:<11} {:>5}", "completed", stats.completed);
    println!("{:<11} {:>5}", "failed", stats.failed);
    Ok(())
}

async fn queue_purge(pool: &SqlitePool) -> Result<()> {
    let removed = storage::purge_queue(pool).await?;
    println!("Deleted {removed} queue items.");
    queue_status(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["scraper-cli", "run"]).unwrap();
        match cli.command {
            Command::Run {
                target_id,
                workers,
                batch_size,
                progress,
                verbose,
                dry_run,
            } => {
                assert_eq!(target_id, None);
                assert_eq!(workers, DEFAULT_WORKERS);
                assert_eq!(batch_size, DEFAULT_BATCH_SIZE);
                assert!(!progress);
                assert!(!verbose);
                assert!(!dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_add_with_flags() {
        let cli = Cli::try_parse_from([
            "scraper-cli",
            "add",
            "--url",
            "https://example.com",
            "--auto-discover",
            "--validate",
            "--user-agent",
            "CustomBot/2.0",
        ])
        .unwrap();
        match cli.command {
            Command::Add {
                url,
                sitemap,
                auto_discover,
                validate,
                user_agent,
            } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(sitemap, None);
                assert!(auto_discover);
                assert!(validate);
                assert_eq!(user_agent.as_deref(), Some("CustomBot/2.0"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_queue_subcommands() {
        let cli = Cli::try_parse_from(["scraper-cli", "queue", "status"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Queue {
                action: QueueAction::Status
            }
        ));
        let cli = Cli::try_parse_from(["scraper-cli", "queue", "purge"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Queue {
                action: QueueAction::Purge
            }
        ));
    }

    #[test]
    fn test_add_requires_url() {
        assert!(Cli::try_parse_from(["scraper-cli", "add"]).is_err());
    }

    #[test]
    fn test_unknown_verb_rejected() {
        assert!(Cli::try_parse_from(["scraper-cli", "frobnicate"]).is_err());
    }
}
