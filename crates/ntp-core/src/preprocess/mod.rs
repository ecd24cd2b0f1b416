//! Preprocessors run over `(prefix, suffix)` before context classification
//! and prompt assembly.
//!
//! Run in declared order. If any preprocessor's `removes_cursor` reports
//! true, the whole request short-circuits to an empty completion — the
//! cursor sits inside content that must not be completed — and `process`
//! is never called for that or any later preprocessor.

mod dataview;
mod length_limit;

pub use dataview::DataviewRemover;
pub use length_limit::LengthLimiter;

use crate::types::CursorContext;

pub trait Preprocessor {
    /// True if the cursor sits inside a region this preprocessor owns and
    /// that must never be completed.
    fn removes_cursor(&self, prefix: &str, suffix: &str) -> bool;

    /// Rewrite `prefix`/`suffix`. Called only when `removes_cursor` is false.
    fn process(&self, prefix: &str, suffix: &str) -> CursorContext;
}

/// Runs `preprocessors` in order. Returns `None` if any of them reports the
/// cursor as unreachable.
pub fn apply(preprocessors: &[Box<dyn Preprocessor + Send + Sync>], ctx: CursorContext) -> Option<CursorContext> {
    let mut current = ctx;
    for p in preprocessors {
        if p.removes_cursor(&current.prefix, &current.suffix) {
            return None;
        }
        current = p.process(&current.prefix, &current.suffix);
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_circuits_on_first_match() {
        let preprocessors: Vec<Box<dyn Preprocessor + Send + Sync>> = vec![
            Box::new(DataviewRemover::new()),
            Box::new(LengthLimiter::default()),
        ];
        let ctx = CursorContext::new("```dataview\nlist from", "\n```\nrest");
        assert!(apply(&preprocessors, ctx).is_none());
    }

    #[test]
    fn chains_through_all_when_none_short_circuit() {
        let preprocessors: Vec<Box<dyn Preprocessor + Send + Sync>> = vec![
            Box::new(DataviewRemover::new()),
            Box::new(LengthLimiter::new(5000, 500)),
        ];
        let ctx = CursorContext::new("plain prefix text", "plain suffix text");
        let result = apply(&preprocessors, ctx).unwrap();
        assert_eq!(result.prefix, "plain prefix text");
        assert_eq!(result.suffix, "plain suffix text");
    }
}
