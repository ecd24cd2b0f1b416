//! Context classification.
//!
//! Inserts a fixed sentinel at the caret, then matches regular expressions
//! over the merged text in a fixed priority order. Precedence is
//! load-bearing: a numbered-list item inside a code fence classifies as
//! [`ContextClass::CodeBlock`], not [`ContextClass::NumberedList`].

use std::sync::{LazyLock, OnceLock};

use regex::Regex;
use uuid::Uuid;

use crate::types::ContextClass;

static SENTINEL: OnceLock<String> = OnceLock::new();

/// The sentinel token used to mark the caret position, generated once per
/// process and reused for every classification in the process lifetime.
pub fn sentinel() -> &'static str {
    SENTINEL.get_or_init(|| {
        let full = Uuid::new_v4().simple().to_string();
        full[..16].to_string()
    })
}

struct CaretPatterns {
    heading: Regex,
    block_quote: Regex,
    task_list: Regex,
    numbered_list: Regex,
    unordered_list: Regex,
}

static CARET_PATTERNS: LazyLock<CaretPatterns> = LazyLock::new(|| {
    let s = regex::escape(sentinel());
    CaretPatterns {
        heading: Regex::new(&format!(r"(?m)^#+[ \t].*{s}.*$")).unwrap(),
        block_quote: Regex::new(&format!(r"(?m)^[ \t]*>.*{s}.*$")).unwrap(),
        task_list: Regex::new(&format!(r"(?m)^[ \t]*(?:-|[0-9]+\.) +\[.\][ \t].*{s}.*$")).unwrap(),
        numbered_list: Regex::new(&format!(r"(?m)^[ \t]*\d+\.[ \t].*{s}.*$")).unwrap(),
        unordered_list: Regex::new(&format!(r"(?m)^[ \t]*[-*][ \t].*{s}.*$")).unwrap(),
    }
});

static MATH_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\$\$.*?\$\$").unwrap());
static INLINE_MATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\$.*?\$").unwrap());
static CODE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`]*`").unwrap());

fn region_contains_sentinel(text: &str, pattern: &Regex) -> bool {
    let needle = sentinel();
    pattern
        .find_iter(text)
        .any(|m| m.as_str().contains(needle))
}

/// Classify the cursor context from the raw `(prefix, suffix)` pair.
pub fn classify(prefix: &str, suffix: &str) -> ContextClass {
    let text = format!("{prefix}{}{suffix}", sentinel());
    let patterns = &*CARET_PATTERNS;

    if patterns.heading.is_match(&text) {
        return ContextClass::Heading;
    }
    if patterns.block_quote.is_match(&text) {
        return ContextClass::BlockQuotes;
    }
    if patterns.task_list.is_match(&text) {
        return ContextClass::TaskList;
    }
    if region_contains_sentinel(&text, &MATH_BLOCK_RE) || region_contains_sentinel(&text, &INLINE_MATH_RE) {
        return ContextClass::MathBlock;
    }
    if region_contains_sentinel(&text, &CODE_BLOCK_RE) || region_contains_sentinel(&text, &INLINE_CODE_RE) {
        return ContextClass::CodeBlock;
    }
    if patterns.numbered_list.is_match(&text) {
        return ContextClass::NumberedList;
    }
    if patterns.unordered_list.is_match(&text) {
        return ContextClass::UnorderedList;
    }
    ContextClass::Text
}
