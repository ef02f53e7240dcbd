//! Classifier decision tree.
//!
//! Rules run in a fixed order; the first that fires wins. Ties between
//! equally frequent selectors break lexicographically so the verdict stays
//! deterministic for a fixed input.

use super::features::PatternStats;
use super::PageFeatures;

/// Minimum total text for a page to be considered at all.
const MIN_TEXT_CHAR_COUNT: usize = 500;
/// A single block longer than this is narrative, not a quote list.
const MIN_LONG_PARAGRAPH_LEN: usize = 400;
/// Minimum number of blocks for list-like structure.
const MIN_NUM_BLOCKS: usize = 3;
/// Minimum share of blocks carried by the dominant selector.
const MIN_DOMINANT_SELECTOR_RATIO: f64 = 0.7;
/// Average quote score establishing clear quote structure.
const HIGH_QUOTE_SCORE: f64 = 0.7;
/// Average quote score for structured-but-diverse content.
const STRUCTURED_QUOTE_SCORE: f64 = 0.5;
/// Share of blocks one author must claim to trigger the bias rule.
const SINGLE_AUTHOR_SHARE: f64 = 0.8;
/// Blocks below this length count toward the short-block ratio.
const SHORT_BLOCK_LEN: usize = 300;
/// Selector appended when colorized blocks are present.
const COLORIZED_SELECTOR: &str = "[style*=color]";
/// Maximum selectors emitted per page.
pub const MAX_PAGE_SELECTORS: usize = 2;

/// Stable tags describing why the classifier reached its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    ShortMainText,
    OneLongParagraph,
    TooFewBlocks,
    DominantSelectorLow,
    SingleAuthorBias,
    QuoteStructure,
    StructuredDiverse,
    DialogPattern,
    LowQuoteScore,
    EdgeCase,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::ShortMainText => "SHORT_MAIN_TEXT",
            DecisionReason::OneLongParagraph => "ONE_LONG_PARAGRAPH",
            DecisionReason::TooFewBlocks => "TOO_FEW_BLOCKS",
            DecisionReason::DominantSelectorLow => "DOMINANT_SELECTOR_LOW",
            DecisionReason::SingleAuthorBias => "SINGLE_AUTHOR_BIAS",
            DecisionReason::QuoteStructure => "QUOTE_STRUCTURE",
            DecisionReason::StructuredDiverse => "STRUCTURED_DIVERSE",
            DecisionReason::DialogPattern => "DIALOG_PATTERN",
            DecisionReason::LowQuoteScore => "LOW_QUOTE_SCORE",
            DecisionReason::EdgeCase => "EDGE_CASE",
        }
    }
}

/// Decision tree output.
#[derive(Debug, Clone)]
pub(crate) struct DecisionOutcome {
    pub reason: DecisionReason,
    pub processable: bool,
    pub selectors: Vec<String>,
    pub confidence: f64,
}

impl DecisionOutcome {
    fn reject(reason: DecisionReason, confidence: f64) -> Self {
        Self {
            reason,
            processable: false,
            selectors: Vec::new(),
            confidence,
        }
    }

    fn accept(reason: DecisionReason, selectors: Vec<String>, confidence: f64) -> Self {
        Self {
            reason,
            processable: true,
            selectors,
            confidence,
        }
    }
}

/// Runs the decision tree and derives the stored feature set.
pub(crate) fn decide(stats: &PatternStats) -> (PageFeatures, DecisionOutcome) {
    let num_blocks = stats.block_lens.len();

    let avg_block_length = if num_blocks > 0 {
        stats.block_lens.iter().sum::<usize>() / num_blocks
    } else {
        0
    };

    let short_block_ratio = if num_blocks > 0 {
        stats
            .block_lens
            .iter()
            .filter(|&&len| len < SHORT_BLOCK_LEN)
            .count() as f64
            / num_blocks as f64
    } else {
        0.0
    };

    let (dominant_selector, dominant_count) = dominant_selector(stats);
    let dominant_selector_ratio = if num_blocks > 0 {
        dominant_count as f64 / num_blocks as f64
    } else {
        0.0
    };

    let avg_quote_score = if num_blocks > 0 {
        stats.quote_scores.iter().sum::<f64>() / num_blocks as f64
    } else {
        0.0
    };
    let stddev_quote_score = if num_blocks > 0 {
        let variance = stats
            .quote_scores
            .iter()
            .map(|qs| (qs - avg_quote_score).powi(2))
            .sum::<f64>()
            / num_blocks as f64;
        variance.sqrt()
    } else {
        0.0
    };

    let max_author_count = stats.block_authors.values().copied().max().unwrap_or(0);
    let single_author_bias =
        num_blocks > 0 && (max_author_count as f64) > SINGLE_AUTHOR_SHARE * num_blocks as f64;

    let outcome = run_rules(
        stats,
        num_blocks,
        &dominant_selector,
        dominant_selector_ratio,
        avg_quote_score,
        single_author_bias,
    );

    let features = PageFeatures {
        text_char_count: stats.text_char_count as i64,
        num_text_blocks: num_blocks as i64,
        avg_block_length: avg_block_length as i64,
        longest_block_length: stats.longest_block_len as i64,
        short_block_ratio,
        dominant_selector_ratio,
        num_distinct_paths: stats.block_paths.len() as i64,
        avg_quote_score,
        stddev_quote_score,
        single_author_bias,
        has_intro_paragraph: stats.intro_paragraph,
        page_contains_dialog_patterns: stats.dialog_pattern,
        has_colorized_blocks: stats.colorized_blocks,
    };

    (features, outcome)
}

/// Most frequent selector; ties break lexicographically.
fn dominant_selector(stats: &PatternStats) -> (String, usize) {
    let mut best: Option<(&str, usize)> = None;
    for (selector, &count) in &stats.selector_count {
        best = match best {
            None => Some((selector.as_str(), count)),
            Some((bs, bc)) if count > bc || (count == bc && selector.as_str() < bs) => {
                Some((selector.as_str(), count))
            }
            keep => keep,
        };
    }
    best.map(|(s, c)| (s.to_string(), c)).unwrap_or_default()
}

fn page_selectors(stats: &PatternStats, dominant: &str) -> Vec<String> {
    let mut selectors = vec![dominant.to_string()];
    if stats.colorized_blocks {
        selectors.push(COLORIZED_SELECTOR.to_string());
    }
    selectors.truncate(MAX_PAGE_SELECTORS);
    selectors
}

fn run_rules(
    stats: &PatternStats,
    num_blocks: usize,
    dominant: &str,
    dominant_ratio: f64,
    avg_quote_score: f64,
    single_author_bias: bool,
) -> DecisionOutcome {
    if stats.text_char_count < MIN_TEXT_CHAR_COUNT {
        return DecisionOutcome::reject(DecisionReason::ShortMainText, 0.1);
    }
    if num_blocks == 1 && stats.longest_block_len > MIN_LONG_PARAGRAPH_LEN {
        return DecisionOutcome::reject(DecisionReason::OneLongParagraph, 0.2);
    }
    if num_blocks < MIN_NUM_BLOCKS {
        return DecisionOutcome::reject(DecisionReason::TooFewBlocks, 0.2);
    }
    if dominant_ratio < MIN_DOMINANT_SELECTOR_RATIO {
        return DecisionOutcome::reject(DecisionReason::DominantSelectorLow, 0.3);
    }
    if single_author_bias {
        return DecisionOutcome::reject(DecisionReason::SingleAuthorBias, avg_quote_score);
    }
    if avg_quote_score >= HIGH_QUOTE_SCORE {
        return DecisionOutcome::accept(
            DecisionReason::QuoteStructure,
            page_selectors(stats, dominant),
            avg_quote_score,
        );
    }
    if avg_quote_score >= STRUCTURED_QUOTE_SCORE && !stats.dialog_pattern {
        return DecisionOutcome::accept(
            DecisionReason::StructuredDiverse,
            page_selectors(stats, dominant),
            avg_quote_score,
        );
    }
    if stats.dialog_pattern {
        return DecisionOutcome::reject(DecisionReason::DialogPattern, 0.3);
    }
    if avg_quote_score < STRUCTURED_QUOTE_SCORE {
        return DecisionOutcome::reject(DecisionReason::LowQuoteScore, avg_quote_score);
    }
    DecisionOutcome::reject(DecisionReason::EdgeCase, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    /// Builds stats describing `n` uniform blocks of `len` chars sharing
    /// one selector, each scoring `score`.
    fn uniform_stats(n: usize, len: usize, score: f64) -> PatternStats {
        PatternStats {
            text_char_count: n * len,
            longest_block_len: len,
            block_lens: vec![len; n],
            quote_scores: vec![score; n],
            block_authors: HashMap::new(),
            intro_paragraph: false,
            colorized_blocks: false,
            selector_count: HashMap::from([("div.quote".to_string(), n)]),
            block_paths: HashSet::from(["html/body/div".to_string()]),
            dialog_pattern: false,
        }
    }

    #[test]
    fn test_short_main_text() {
        let stats = uniform_stats(4, 50, 0.6); // 200 chars total
        let (_, outcome) = decide(&stats);
        assert_eq!(outcome.reason, DecisionReason::ShortMainText);
        assert!(!outcome.processable);
        assert_eq!(outcome.confidence, 0.1);
    }

    #[test]
    fn test_one_long_paragraph() {
        let stats = uniform_stats(1, 800, 0.3);
        let (_, outcome) = decide(&stats);
        assert_eq!(outcome.reason, DecisionReason::OneLongParagraph);
        assert_eq!(outcome.confidence, 0.2);
    }

    #[test]
    fn test_too_few_blocks() {
        let stats = uniform_stats(2, 400, 0.6);
        let (_, outcome) = decide(&stats);
        assert_eq!(outcome.reason, DecisionReason::TooFewBlocks);
    }

    #[test]
    fn test_dominant_selector_low() {
        let mut stats = uniform_stats(10, 100, 0.6);
        stats.selector_count =
            HashMap::from([("div.a".to_string(), 5), ("div.b".to_string(), 5)]);
        let (features, outcome) = decide(&stats);
        assert_eq!(outcome.reason, DecisionReason::DominantSelectorLow);
        assert!((features.dominant_selector_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_single_author_bias() {
        let mut stats = uniform_stats(10, 100, 0.6);
        stats.block_authors = HashMap::from([("One Author".to_string(), 9)]);
        let (features, outcome) = decide(&stats);
        assert!(features.single_author_bias);
        assert_eq!(outcome.reason, DecisionReason::SingleAuthorBias);
        assert!(!outcome.processable);
        assert!((outcome.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_author_at_exact_threshold_is_not_bias() {
        let mut stats = uniform_stats(10, 100, 0.6);
        stats.block_authors = HashMap::from([("One Author".to_string(), 8)]);
        let (features, _) = decide(&stats);
        // Bias requires strictly more than 80%.
        assert!(!features.single_author_bias);
    }

    #[test]
    fn test_quote_structure() {
        let stats = uniform_stats(10, 100, 0.75);
        let (_, outcome) = decide(&stats);
        assert_eq!(outcome.reason, DecisionReason::QuoteStructure);
        assert!(outcome.processable);
        assert_eq!(outcome.selectors, vec!["div.quote".to_string()]);
        assert!((outcome.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_structured_diverse() {
        let stats = uniform_stats(10, 100, 0.55);
        let (_, outcome) = decide(&stats);
        assert_eq!(outcome.reason, DecisionReason::StructuredDiverse);
        assert!(outcome.processable);
    }

    #[test]
    fn test_dialog_pattern_blocks_structured_diverse() {
        let mut stats = uniform_stats(10, 100, 0.55);
        stats.dialog_pattern = true;
        let (_, outcome) = decide(&stats);
        assert_eq!(outcome.reason, DecisionReason::DialogPattern);
        assert_eq!(outcome.confidence, 0.3);
    }

    #[test]
    fn test_high_quote_score_wins_despite_dialog() {
        // A high average outranks the dialog check in rule order.
        let mut stats = uniform_stats(10, 100, 0.8);
        stats.dialog_pattern = true;
        let (_, outcome) = decide(&stats);
        assert_eq!(outcome.reason, DecisionReason::QuoteStructure);
    }

    #[test]
    fn test_low_quote_score() {
        let stats = uniform_stats(10, 100, 0.2);
        let (_, outcome) = decide(&stats);
        assert_eq!(outcome.reason, DecisionReason::LowQuoteScore);
        assert!((outcome.confidence - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_colorized_appends_style_selector() {
        let mut stats = uniform_stats(10, 100, 0.75);
        stats.colorized_blocks = true;
        let (_, outcome) = decide(&stats);
        assert_eq!(
            outcome.selectors,
            vec!["div.quote".to_string(), COLORIZED_SELECTOR.to_string()]
        );
        assert!(outcome.selectors.len() <= MAX_PAGE_SELECTORS);
    }

    #[test]
    fn test_dominant_selector_tie_breaks_lexicographically() {
        let mut stats = uniform_stats(10, 100, 0.75);
        stats.selector_count =
            HashMap::from([("div.b".to_string(), 5), ("div.a".to_string(), 5)]);
        // Ratio 0.5 rejects the page, but the dominant choice itself must be
        // stable for determinism; verify directly.
        let (selector, count) = dominant_selector(&stats);
        assert_eq!(selector, "div.a");
        assert_eq!(count, 5);
    }

    #[test]
    fn test_feature_derivation() {
        let mut stats = uniform_stats(4, 100, 0.5);
        stats.block_lens = vec![50, 100, 350, 100];
        stats.longest_block_len = 350;
        stats.text_char_count = 600;
        let (features, _) = decide(&stats);
        assert_eq!(features.num_text_blocks, 4);
        assert_eq!(features.avg_block_length, 150);
        assert_eq!(features.longest_block_length, 350);
        assert!((features.short_block_ratio - 0.75).abs() < 1e-9);
        assert_eq!(features.num_distinct_paths, 1);
    }
}
