//! Sitemap fetching and resolution.
//!
//! Handles both shapes of a sitemap.org document (a `<sitemapindex>` of
//! child sitemaps, or a flat `<urlset>`) with per-target regex filtering
//! and `<lastmod>` normalization.

mod resolver;
mod types;

pub use resolver::{
    auto_discover_sitemap, parse_sitemap_url, validate_sitemap, ResolvedSitemap, Resolver,
};
pub use types::{parse_lastmod, SitemapEntry, SitemapIndex, SitemapRef, SitemapUrl, UrlSet};
