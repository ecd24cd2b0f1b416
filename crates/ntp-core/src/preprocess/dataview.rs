use std::sync::LazyLock;

use regex::Regex;

use super::Preprocessor;
use crate::context::sentinel;
use crate::types::CursorContext;

static DATAVIEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```dataview(js)?.*?```").unwrap());

/// Strips fenced ` ```dataview ` / ` ```dataviewjs ` blocks. These are
/// Obsidian query blocks, not prose — completing inside one would mean
/// hallucinating query syntax.
#[derive(Default)]
pub struct DataviewRemover;

impl DataviewRemover {
    pub fn new() -> Self {
        Self
    }
}

impl Preprocessor for DataviewRemover {
    fn removes_cursor(&self, prefix: &str, suffix: &str) -> bool {
        let text = format!("{prefix}{}{suffix}", sentinel());
        DATAVIEW_RE
            .find_iter(&text)
            .any(|m| m.as_str().contains(sentinel()))
    }

    fn process(&self, prefix: &str, suffix: &str) -> CursorContext {
        let text = format!("{prefix}{}{suffix}", sentinel());
        let cleaned = DATAVIEW_RE.replace_all(&text, "");
        let (new_prefix, new_suffix) = cleaned
            .split_once(sentinel())
            .unwrap_or((cleaned.as_ref(), ""));
        CursorContext::new(new_prefix, new_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_inside_dataview_block_short_circuits() {
        let r = DataviewRemover::new();
        assert!(r.removes_cursor("```dataview\nlist from ", "\n```\nrest"));
    }

    #[test]
    fn cursor_outside_dataview_block_does_not_short_circuit() {
        let r = DataviewRemover::new();
        assert!(!r.removes_cursor("```dataview\nlist from #tag\n```\nrest", ""));
    }

    #[test]
    fn process_removes_block_and_preserves_surrounding_text() {
        let r = DataviewRemover::new();
        let result = r.process(
            "before\n```dataview\nlist from #tag\n```\n",
            "after block",
        );
        assert_eq!(result.prefix, "before\n");
        assert_eq!(result.suffix, "after block");
    }

    #[test]
    fn dataviewjs_fence_is_also_matched() {
        let r = DataviewRemover::new();
        assert!(r.removes_cursor("```dataviewjs\nconst x = ", "\n```\n"));
    }
}
