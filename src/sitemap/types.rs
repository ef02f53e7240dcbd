//! Sitemap wire types (sitemap.org XML).

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Root of a sitemap index document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SitemapIndex {
    #[serde(rename = "sitemap", default)]
    pub sitemaps: Vec<SitemapRef>,
}

/// A `<sitemap>` child inside a sitemap index.
#[derive(Debug, Clone, Deserialize)]
pub struct SitemapRef {
    pub loc: String,
    #[serde(default)]
    pub lastmod: Option<String>,
}

/// Root of a urlset document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlSet {
    #[serde(rename = "url", default)]
    pub urls: Vec<SitemapUrl>,
}

/// A `<url>` entry inside a urlset.
#[derive(Debug, Clone, Deserialize)]
pub struct SitemapUrl {
    pub loc: String,
    #[serde(default)]
    pub lastmod: Option<String>,
    #[serde(default)]
    pub changefreq: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

/// A resolved sitemap entry: page URL plus its normalized `<lastmod>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
}

/// Normalizes a raw `<lastmod>` value.
///
/// Tries bare dates (`YYYY-MM-DD`) first, then full RFC 3339 timestamps.
/// Anything else is treated as absent.
pub fn parse_lastmod(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc));
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_lastmod_bare_date() {
        let parsed = parse_lastmod("2024-03-15").expect("date should parse");
        assert_eq!(parsed.to_rfc3339(), "2024-03-15T00:00:00+00:00");
    }

    #[test]
    fn test_parse_lastmod_rfc3339() {
        let parsed = parse_lastmod("2024-03-15T10:30:00+02:00").expect("timestamp should parse");
        assert_eq!(parsed.hour(), 8); // normalized to UTC
    }

    #[test]
    fn test_parse_lastmod_garbage() {
        assert!(parse_lastmod("yesterday").is_none());
        assert!(parse_lastmod("").is_none());
        assert!(parse_lastmod("2024-13-45").is_none());
    }

    #[test]
    fn test_deserialize_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://example.com/a/</loc><lastmod>2024-01-01</lastmod></url>
              <url><loc>https://example.com/b/</loc><changefreq>daily</changefreq><priority>0.8</priority></url>
            </urlset>"#;
        let urlset: UrlSet = quick_xml::de::from_str(xml).expect("urlset should decode");
        assert_eq!(urlset.urls.len(), 2);
        assert_eq!(urlset.urls[0].loc, "https://example.com/a/");
        assert_eq!(urlset.urls[0].lastmod.as_deref(), Some("2024-01-01"));
        assert_eq!(urlset.urls[1].changefreq.as_deref(), Some("daily"));
    }

    #[test]
    fn test_deserialize_sitemapindex() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <sitemap><loc>https://example.com/post-sitemap.xml</loc><lastmod>2024-02-02</lastmod></sitemap>
              <sitemap><loc>https://example.com/page-sitemap.xml</loc></sitemap>
            </sitemapindex>"#;
        let index: SitemapIndex = quick_xml::de::from_str(xml).expect("index should decode");
        assert_eq!(index.sitemaps.len(), 2);
        assert_eq!(index.sitemaps[0].loc, "https://example.com/post-sitemap.xml");
    }

    #[test]
    fn test_urlset_decoded_as_index_has_no_children() {
        // The resolver probes for an index first; a urlset body must simply
        // yield zero children rather than an error.
        let xml = r#"<urlset><url><loc>https://example.com/a/</loc></url></urlset>"#;
        let index: SitemapIndex = quick_xml::de::from_str(xml).unwrap_or_default();
        assert!(index.sitemaps.is_empty());
    }
}
