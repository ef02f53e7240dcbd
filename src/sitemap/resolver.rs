//! Sitemap resolution, auto-discovery, and validation.
//!
//! Resolution for a target loads its pattern configuration from the store
//! (falling back to defaults on absence or corrupt JSON), fetches the
//! configured sitemap with the target's user-agent, transparently handles
//! sitemap-index vs urlset, and returns the filtered URL list. Per-child
//! failures inside an index are logged and skipped; partial results are
//! valid.

use std::sync::Arc;

use log::warn;
use regex::Regex;
use reqwest::header::{ACCEPT, USER_AGENT};
use sqlx::SqlitePool;
use url::Url;

use crate::config::{
    compile_patterns, default_if_empty, default_patterns, DEFAULT_USER_AGENT, REQUEST_TIMEOUT,
    SITEMAP_DISCOVERY_PATHS,
};
use crate::error_handling::SitemapError;
use crate::sitemap::types::{parse_lastmod, SitemapEntry, SitemapIndex, UrlSet};
use crate::storage::{self, DbLogger, Target};

/// Result of resolving a target's sitemap.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSitemap {
    /// Page URLs surviving the URL-pattern filter, in document order.
    pub urls: Vec<SitemapEntry>,
    /// Child sitemap locations kept by the sitemap-pattern filter (empty
    /// for flat urlsets).
    pub sub_sitemaps: Vec<String>,
}

/// Sitemap resolver bound to the store.
pub struct Resolver {
    client: reqwest::Client,
    pool: Arc<SqlitePool>,
    logger: DbLogger,
}

impl Resolver {
    pub fn new(pool: Arc<SqlitePool>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let logger = DbLogger::new(Arc::clone(&pool));
        Ok(Self {
            client,
            pool,
            logger,
        })
    }

    /// Resolves the sitemap configured on a target.
    ///
    /// # Errors
    ///
    /// Fails when the target is missing, has no sitemap URL, carries an
    /// invalid pattern, or the root sitemap cannot be fetched or decoded.
    /// Sub-sitemap failures are non-fatal.
    pub async fn resolve_for_target(&self, target_id: i64) -> Result<ResolvedSitemap, SitemapError> {
        let target = storage::get_target(self.pool.as_ref(), target_id).await?;

        let sitemap_url = target
            .sitemap_url
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(SitemapError::NoSitemapUrl)?;

        let (sitemap_patterns, url_patterns) = self.load_patterns(&target).await;
        let compiled_sitemap_patterns = compile_patterns(&sitemap_patterns)?;
        let compiled_url_patterns = compile_patterns(&url_patterns)?;

        let user_agent = target
            .user_agent
            .clone()
            .filter(|ua| !ua.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        self.logger
            .info(
                Some(target_id),
                Some(&sitemap_url),
                &format!("Starting sitemap parsing for target {target_id}"),
            )
            .await;

        let result = self
            .resolve_with_patterns(
                target_id,
                &sitemap_url,
                &user_agent,
                &compiled_sitemap_patterns,
                &compiled_url_patterns,
            )
            .await;

        match &result {
            Ok(resolved) => {
                self.logger
                    .log(
                        storage::LogLevel::Info,
                        Some(target_id),
                        Some(&sitemap_url),
                        "Sitemap parsing completed",
                        Some(serde_json::json!({
                            "url_count": resolved.urls.len(),
                            "sitemap_count": resolved.sub_sitemaps.len(),
                        })),
                    )
                    .await;
            }
            Err(e) => {
                self.logger
                    .error_with(
                        Some(target_id),
                        Some(&sitemap_url),
                        "Sitemap parsing failed",
                        serde_json::json!({ "error": e.to_string() }),
                    )
                    .await;
            }
        }

        result
    }

    /// Loads pattern lists from the target row, falling back to defaults.
    ///
    /// Corrupt stored JSON yields a warning and the defaults; it never
    /// fails the run.
    async fn load_patterns(&self, target: &Target) -> (Vec<String>, Vec<String>) {
        let mut sitemap_patterns = Vec::new();
        let mut url_patterns = Vec::new();

        if let Some(raw) = target.sitemap_patterns.as_deref().filter(|s| !s.is_empty()) {
            match serde_json::from_str::<Vec<String>>(raw) {
                Ok(patterns) => sitemap_patterns = patterns,
                Err(e) => {
                    self.logger
                        .warn_with(
                            Some(target.id),
                            None,
                            "Failed to parse sitemap patterns",
                            serde_json::json!({ "error": e.to_string(), "patterns": raw }),
                        )
                        .await;
                }
            }
        }
        if let Some(raw) = target.url_patterns.as_deref().filter(|s| !s.is_empty()) {
            match serde_json::from_str::<Vec<String>>(raw) {
                Ok(patterns) => url_patterns = patterns,
                Err(e) => {
                    self.logger
                        .warn_with(
                            Some(target.id),
                            None,
                            "Failed to parse URL patterns",
                            serde_json::json!({ "error": e.to_string(), "patterns": raw }),
                        )
                        .await;
                }
            }
        }

        let defaults = default_patterns();
        (
            default_if_empty(sitemap_patterns, defaults.sitemap_patterns),
            default_if_empty(url_patterns, defaults.url_patterns),
        )
    }

    async fn resolve_with_patterns(
        &self,
        target_id: i64,
        sitemap_url: &str,
        user_agent: &str,
        sitemap_patterns: &[Regex],
        url_patterns: &[Regex],
    ) -> Result<ResolvedSitemap, SitemapError> {
        let body = fetch_body(&self.client, sitemap_url, user_agent).await?;

        // A sitemap index and a urlset share the same envelope; probe for
        // child sitemaps first.
        if let Ok(index) = quick_xml::de::from_str::<SitemapIndex>(&body) {
            if !index.sitemaps.is_empty() {
                return self
                    .process_index(target_id, index, user_agent, sitemap_patterns, url_patterns)
                    .await;
            }
        }

        let urlset: UrlSet = quick_xml::de::from_str(&body)?;
        Ok(ResolvedSitemap {
            urls: filter_urls(urlset, url_patterns),
            sub_sitemaps: Vec::new(),
        })
    }

    /// Fetches the relevant children of a sitemap index.
    async fn process_index(
        &self,
        target_id: i64,
        index: SitemapIndex,
        user_agent: &str,
        sitemap_patterns: &[Regex],
        url_patterns: &[Regex],
    ) -> Result<ResolvedSitemap, SitemapError> {
        let total = index.sitemaps.len();
        let relevant: Vec<String> = index
            .sitemaps
            .into_iter()
            .map(|s| s.loc)
            .filter(|loc| matches_any(loc, sitemap_patterns))
            .collect();

        self.logger
            .log(
                storage::LogLevel::Info,
                Some(target_id),
                None,
                "Processing sitemap index",
                Some(serde_json::json!({
                    "total_sitemaps": total,
                    "relevant_sitemaps": relevant.len(),
                })),
            )
            .await;

        let mut resolved = ResolvedSitemap::default();
        for loc in &relevant {
            let urlset = match self.fetch_urlset(loc, user_agent).await {
                Ok(urlset) => urlset,
                Err(e) => {
                    self.logger
                        .warn_with(
                            Some(target_id),
                            Some(loc),
                            "Failed to fetch sub-sitemap, continuing with others",
                            serde_json::json!({ "error": e.to_string() }),
                        )
                        .await;
                    continue;
                }
            };
            resolved.urls.extend(filter_urls(urlset, url_patterns));
        }
        resolved.sub_sitemaps = relevant;
        Ok(resolved)
    }

    async fn fetch_urlset(&self, url: &str, user_agent: &str) -> Result<UrlSet, SitemapError> {
        let body = fetch_body(&self.client, url, user_agent).await?;
        Ok(quick_xml::de::from_str(&body)?)
    }
}

/// GETs a sitemap body, asserting status 200.
async fn fetch_body(
    client: &reqwest::Client,
    url: &str,
    user_agent: &str,
) -> Result<String, SitemapError> {
    let response = client
        .get(url)
        .header(USER_AGENT, user_agent)
        .header(ACCEPT, "application/xml, text/xml, */*")
        .send()
        .await?;
    let status = response.status();
    if status.as_u16() != 200 {
        return Err(SitemapError::HttpStatus(status.as_u16()));
    }
    Ok(response.text().await?)
}

fn matches_any(value: &str, patterns: &[Regex]) -> bool {
    // An empty pattern list keeps everything.
    patterns.is_empty() || patterns.iter().any(|re| re.is_match(value))
}

fn filter_urls(urlset: UrlSet, patterns: &[Regex]) -> Vec<SitemapEntry> {
    urlset
        .urls
        .into_iter()
        .filter(|u| matches_any(&u.loc, patterns))
        .map(|u| SitemapEntry {
            lastmod: u.lastmod.as_deref().and_then(parse_lastmod),
            loc: u.loc,
        })
        .collect()
}

/// Probes common sitemap locations and returns the first that answers 200.
///
/// `robots.txt` hits are ignored for sitemap extraction.
///
/// # Errors
///
/// `SitemapError::NotFound` when no common location matches.
pub async fn auto_discover_sitemap(
    client: &reqwest::Client,
    website_url: &str,
) -> Result<String, SitemapError> {
    let parsed = Url::parse(website_url)?;
    let base = format!(
        "{}://{}",
        parsed.scheme(),
        parsed.host_str().unwrap_or_default()
    );
    let base = match parsed.port() {
        Some(port) => format!("{base}:{port}"),
        None => base,
    };

    for path in SITEMAP_DISCOVERY_PATHS {
        let probe = format!("{base}{path}");
        let response = match client.get(&probe).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Sitemap probe failed for {probe}: {e}");
                continue;
            }
        };
        if response.status().as_u16() == 200 {
            if *path == "/robots.txt" {
                continue;
            }
            return Ok(probe);
        }
    }
    Err(SitemapError::NotFound)
}

/// Checks that the sitemap at `sitemap_url` is reachable and answers 200.
pub async fn validate_sitemap(
    client: &reqwest::Client,
    sitemap_url: &str,
    user_agent: &str,
) -> Result<(), SitemapError> {
    let response = client
        .get(sitemap_url)
        .header(USER_AGENT, user_agent)
        .send()
        .await?;
    let status = response.status();
    if status.as_u16() != 200 {
        return Err(SitemapError::HttpStatus(status.as_u16()));
    }
    Ok(())
}

/// Fetches a urlset for preview, without any pattern filtering.
///
/// Used by `validate` to show what a sitemap would contribute before a
/// target exists.
pub async fn parse_sitemap_url(
    client: &reqwest::Client,
    sitemap_url: &str,
    user_agent: &str,
) -> Result<Vec<SitemapEntry>, SitemapError> {
    let body = fetch_body(client, sitemap_url, user_agent).await?;
    let urlset: UrlSet = quick_xml::de::from_str(&body)?;
    Ok(urlset
        .urls
        .into_iter()
        .map(|u| SitemapEntry {
            lastmod: u.lastmod.as_deref().and_then(parse_lastmod),
            loc: u.loc,
        })
        .collect())
}
