//! HTML feature extraction for the page classifier.
//!
//! Traverses the parsed DOM, finds the main content root, collects text
//! blocks from block-level elements, and mines the pattern statistics the
//! decision tree runs on.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

/// Block-level tags considered for text extraction.
const BLOCK_TAGS: &[&str] = &[
    "div",
    "p",
    "blockquote",
    "section",
    "article",
    "main",
    "li",
    "ul",
    "ol",
];

/// Main content selectors tried in document order before falling back to
/// the element with the most text.
const MAIN_CONTENT_SELECTORS: &[&str] =
    &["article", "main", "#content", ".post-content", "#main", ".entry-content"];

/// Quote block length band.
const MIN_QUOTE_LENGTH: usize = 30;
const MAX_QUOTE_LENGTH: usize = 300;
/// A first block shorter than this counts as an intro paragraph.
const INTRO_PARAGRAPH_MAX: usize = 120;
/// Blocks above this depth lose the shallow bonus.
const SHALLOW_DEPTH_MAX: usize = 4;
/// Prefix marking dialog-formatted lines.
const DIALOG_PREFIX: &str = "\u{2013}"; // en dash

/// Trailing attribution like `— Name` or `– Name` at the end of a block.
static AUTHOR_ATTRIBUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\u{2014}\u{2013}]\s*([A-Z][\w .'-]{1,40})$")
        .expect("author attribution regex is valid")
});

/// A candidate text block collected during traversal.
#[derive(Debug, Clone)]
pub(crate) struct TextBlock {
    pub text: String,
    pub selector: String,
    pub path: String,
    pub depth: usize,
    pub colorized: bool,
}

/// Statistics mined over a page's text blocks.
#[derive(Debug, Clone, Default)]
pub(crate) struct PatternStats {
    pub text_char_count: usize,
    pub longest_block_len: usize,
    pub block_lens: Vec<usize>,
    pub quote_scores: Vec<f64>,
    pub block_authors: HashMap<String, usize>,
    pub intro_paragraph: bool,
    pub colorized_blocks: bool,
    pub selector_count: HashMap<String, usize>,
    pub block_paths: HashSet<String>,
    pub dialog_pattern: bool,
}

/// Parses HTML and mines pattern statistics over its text blocks.
pub(crate) fn extract_features(html: &str) -> PatternStats {
    let document = Html::parse_document(html);
    let root = find_main_content_node(&document);
    let blocks = extract_text_blocks(root);
    build_pattern_stats(&blocks)
}

/// Finds the main content root: first element matching a known content
/// selector in document order, else the element with the most text.
fn find_main_content_node(document: &Html) -> ElementRef<'_> {
    let root = document.root_element();
    for node in root.descendants() {
        if let Some(element) = ElementRef::wrap(node) {
            if MAIN_CONTENT_SELECTORS
                .iter()
                .any(|sel| matches_simple_selector(&element, sel))
            {
                return element;
            }
        }
    }
    find_node_with_most_text(root)
}

/// Matches the restricted selector grammar used for content roots:
/// `#id`, `.class`, or a bare tag name.
fn matches_simple_selector(element: &ElementRef<'_>, selector: &str) -> bool {
    let selector = selector.trim();
    if selector.is_empty() {
        return false;
    }
    if let Some(id) = selector.strip_prefix('#') {
        return element.value().attr("id") == Some(id);
    }
    if let Some(class) = selector.strip_prefix('.') {
        return element
            .value()
            .attr("class")
            .map(|attr| attr.split_whitespace().any(|c| c == class))
            .unwrap_or(false);
    }
    element.value().name().eq_ignore_ascii_case(selector)
}

fn find_node_with_most_text(root: ElementRef<'_>) -> ElementRef<'_> {
    let mut max_node = root;
    let mut max_len = 0;
    for node in root.descendants() {
        if let Some(element) = ElementRef::wrap(node) {
            let len = element.text().collect::<String>().trim().len();
            if len > max_len {
                max_len = len;
                max_node = element;
            }
        }
    }
    max_node
}

/// Collects candidate text blocks from the subtree under `root`.
///
/// Nested block elements each produce their own block; a list and its items
/// are all candidates, and the selector frequency statistics sort out which
/// granularity dominates.
fn extract_text_blocks(root: ElementRef<'_>) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    visit(root, 0, &mut blocks);
    blocks
}

fn visit(element: ElementRef<'_>, depth: usize, blocks: &mut Vec<TextBlock>) {
    if is_block_element(element.value().name()) {
        let text = element.text().collect::<String>();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            blocks.push(TextBlock {
                text: trimmed.to_string(),
                selector: build_selector(&element),
                path: build_path(&element),
                depth,
                colorized: has_color_style(&element),
            });
        }
    }
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            visit(child_element, depth + 1, blocks);
        }
    }
}

fn is_block_element(tag: &str) -> bool {
    BLOCK_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t))
}

/// Builds the block's CSS selector: `tag#id` when an id is present,
/// `tag.class.class…` when classes are, bare tag otherwise.
fn build_selector(element: &ElementRef<'_>) -> String {
    let tag = element.value().name();
    if let Some(id) = element.value().attr("id").filter(|v| !v.is_empty()) {
        return format!("{tag}#{id}");
    }
    if let Some(class) = element.value().attr("class").filter(|v| !v.is_empty()) {
        return format!("{tag}.{}", class.replace(' ', "."));
    }
    tag.to_string()
}

/// Builds the tag path from the document root down to the element.
fn build_path(element: &ElementRef<'_>) -> String {
    let mut parts = vec![element.value().name().to_string()];
    let mut current = element.parent();
    while let Some(node) = current {
        match ElementRef::wrap(node) {
            Some(parent) => {
                parts.insert(0, parent.value().name().to_string());
                current = node.parent();
            }
            None => break,
        }
    }
    parts.join("/")
}

fn has_color_style(element: &ElementRef<'_>) -> bool {
    element
        .value()
        .attr("style")
        .map(|style| style.contains("color"))
        .unwrap_or(false)
}

// Heuristic helpers for quote-likeness.

fn has_explicit_sentence_end(text: &str) -> bool {
    text.ends_with('.') || text.ends_with('!') || text.ends_with('?')
}

fn starts_with_capital(text: &str) -> bool {
    text.chars()
        .next()
        .map(|c| c.to_uppercase().to_string() == c.to_string())
        .unwrap_or(false)
}

fn is_dialog_format(text: &str) -> bool {
    text.starts_with(DIALOG_PREFIX)
}

fn is_proper_length(text: &str) -> bool {
    (MIN_QUOTE_LENGTH..=MAX_QUOTE_LENGTH).contains(&text.len())
}

fn is_shallow(depth: usize) -> bool {
    depth < SHALLOW_DEPTH_MAX
}

/// Scores how quote-like a single block looks.
pub(crate) fn compute_quote_score(block: &TextBlock) -> f64 {
    let mut score = 0.0;
    if is_proper_length(&block.text) {
        score += 0.3;
    }
    if has_explicit_sentence_end(&block.text) {
        score += 0.1;
    }
    if starts_with_capital(&block.text) {
        score += 0.1;
    }
    if is_dialog_format(&block.text) {
        score -= 0.1;
    }
    if is_shallow(block.depth) {
        score += 0.1;
    }
    score
}

/// Mines statistics over all blocks.
pub(crate) fn build_pattern_stats(blocks: &[TextBlock]) -> PatternStats {
    let mut stats = PatternStats::default();
    for (i, block) in blocks.iter().enumerate() {
        let len = block.text.len();
        stats.text_char_count += len;
        stats.block_lens.push(len);
        if len > stats.longest_block_len {
            stats.longest_block_len = len;
        }
        *stats.selector_count.entry(block.selector.clone()).or_insert(0) += 1;
        stats.block_paths.insert(block.path.clone());
        stats.quote_scores.push(compute_quote_score(block));

        if let Some(captures) = AUTHOR_ATTRIBUTION.captures(&block.text) {
            let author = captures[1].trim().to_string();
            *stats.block_authors.entry(author).or_insert(0) += 1;
        }
        if i == 0 && len < INTRO_PARAGRAPH_MAX {
            stats.intro_paragraph = true;
        }
        if block.colorized {
            stats.colorized_blocks = true;
        }
        if is_dialog_format(&block.text) {
            stats.dialog_pattern = true;
        }
    }
    stats
}
