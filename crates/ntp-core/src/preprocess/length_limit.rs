use super::Preprocessor;
use crate::types::CursorContext;

const DEFAULT_MAX_PREFIX: usize = 5000;
const DEFAULT_MAX_SUFFIX: usize = 500;

/// Clamps prefix to its last `max_prefix` chars and suffix to its first
/// `max_suffix` chars. Never short-circuits.
pub struct LengthLimiter {
    max_prefix: usize,
    max_suffix: usize,
}

impl Default for LengthLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PREFIX, DEFAULT_MAX_SUFFIX)
    }
}

impl LengthLimiter {
    pub fn new(max_prefix: usize, max_suffix: usize) -> Self {
        Self {
            max_prefix,
            max_suffix,
        }
    }
}

impl Preprocessor for LengthLimiter {
    fn removes_cursor(&self, _prefix: &str, _suffix: &str) -> bool {
        false
    }

    fn process(&self, prefix: &str, suffix: &str) -> CursorContext {
        let prefix_tail = tail_chars(prefix, self.max_prefix);
        let suffix_head = head_chars(suffix, self.max_suffix);
        CursorContext::new(prefix_tail, suffix_head)
    }
}

fn tail_chars(s: &str, n: usize) -> &str {
    let len = s.chars().count();
    if len <= n {
        return s;
    }
    let skip = len - n;
    let byte_idx = s.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(0);
    &s[byte_idx..]
}

fn head_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_short_strings_untouched() {
        let l = LengthLimiter::new(5000, 500);
        let result = l.process("short", "also short");
        assert_eq!(result.prefix, "short");
        assert_eq!(result.suffix, "also short");
    }

    #[test]
    fn truncates_prefix_to_its_tail() {
        let l = LengthLimiter::new(3, 500);
        let result = l.process("abcdef", "");
        assert_eq!(result.prefix, "def");
    }

    #[test]
    fn truncates_suffix_to_its_head() {
        let l = LengthLimiter::new(5000, 3);
        let result = l.process("", "abcdef");
        assert_eq!(result.suffix, "abc");
    }

    #[test]
    fn never_short_circuits() {
        let l = LengthLimiter::default();
        assert!(!l.removes_cursor("anything", "anything"));
    }

    #[test]
    fn is_char_boundary_safe_with_multibyte_text() {
        let l = LengthLimiter::new(2, 2);
        let result = l.process("héllo", "wörld");
        assert_eq!(result.prefix.chars().count(), 2);
        assert_eq!(result.suffix.chars().count(), 2);
    }
}
