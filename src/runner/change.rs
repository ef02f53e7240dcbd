//! Change detection: skip, or store as new/updated.
//!
//! `last_updated_at` is sourced from the sitemap's `<lastmod>` when
//! provided, giving a cheap "is there news?" gate without refetching; the
//! content hash is the authoritative tiebreaker when the gate is ambiguous.

use crate::storage::Page;

/// Outcome of the change decision for one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDecision {
    /// Write (insert or update) the page row.
    Store,
    /// We already revisited since the last known update; nothing to do.
    SkipUpToDate,
    /// An update was signalled but the body is byte-identical.
    SkipSameHash,
}

impl ChangeDecision {
    pub fn is_skip(&self) -> bool {
        !matches!(self, ChangeDecision::Store)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeDecision::Store => "store",
            ChangeDecision::SkipUpToDate => "skip-up-to-date",
            ChangeDecision::SkipSameHash => "skip-same-hash",
        }
    }
}

/// Decides whether a freshly fetched body needs storing.
///
/// 1. No prior page ⇒ store.
/// 2. Visited since the last known update ⇒ skip (up to date).
/// 3. Update signalled but hash unchanged ⇒ skip (same hash).
/// 4. Otherwise ⇒ store.
pub fn detect_change(stored: Option<&Page>, new_hash: &str) -> ChangeDecision {
    let Some(page) = stored else {
        return ChangeDecision::Store;
    };

    match (page.last_visited_at, page.last_updated_at) {
        (Some(visited), Some(updated)) if visited > updated => ChangeDecision::SkipUpToDate,
        (Some(visited), Some(updated)) if visited < updated => {
            if page.content_hash.as_deref() == Some(new_hash) {
                ChangeDecision::SkipSameHash
            } else {
                ChangeDecision::Store
            }
        }
        _ => ChangeDecision::Store,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn page(
        hash: &str,
        visited_hours_ago: Option<i64>,
        updated_hours_ago: Option<i64>,
    ) -> Page {
        let now = Utc::now();
        Page {
            id: 1,
            target_id: 1,
            url_path: "/p/".to_string(),
            full_url: "https://example.com/p/".to_string(),
            html_content: Some("body".to_string()),
            content_hash: Some(hash.to_string()),
            http_status_code: Some(200),
            response_time_ms: Some(10),
            content_length: Some(4),
            last_visited_at: visited_hours_ago.map(|h| now - Duration::hours(h)),
            last_updated_at: updated_hours_ago.map(|h| now - Duration::hours(h)),
        }
    }

    #[test]
    fn test_no_prior_page_stores() {
        assert_eq!(detect_change(None, "abc"), ChangeDecision::Store);
    }

    #[test]
    fn test_visited_after_update_skips() {
        // Visited 1h ago, updated 2h ago: nothing new since our last visit.
        let p = page("abc", Some(1), Some(2));
        assert_eq!(detect_change(Some(&p), "def"), ChangeDecision::SkipUpToDate);
    }

    #[test]
    fn test_update_signalled_same_hash_skips() {
        // Updated 2h ago, visited 3h ago, but the body is identical.
        let p = page("abc", Some(3), Some(2));
        assert_eq!(detect_change(Some(&p), "abc"), ChangeDecision::SkipSameHash);
    }

    #[test]
    fn test_update_signalled_new_hash_stores() {
        let p = page("abc", Some(3), Some(2));
        assert_eq!(detect_change(Some(&p), "def"), ChangeDecision::Store);
    }

    #[test]
    fn test_missing_timestamps_store() {
        // Ambiguous state: hash comparison alone cannot prove freshness.
        let p = page("abc", None, Some(2));
        assert_eq!(detect_change(Some(&p), "abc"), ChangeDecision::Store);
        let p = page("abc", Some(2), None);
        assert_eq!(detect_change(Some(&p), "abc"), ChangeDecision::Store);
        let p = page("abc", None, None);
        assert_eq!(detect_change(Some(&p), "abc"), ChangeDecision::Store);
    }

    #[test]
    fn test_skip_helpers() {
        assert!(ChangeDecision::SkipUpToDate.is_skip());
        assert!(ChangeDecision::SkipSameHash.is_skip());
        assert!(!ChangeDecision::Store.is_skip());
        assert_eq!(ChangeDecision::SkipSameHash.as_str(), "skip-same-hash");
    }
}
