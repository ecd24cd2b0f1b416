//! Stable request fingerprinting for cache keys and single-flight keys.
//!
//! Two requests that are visually identical near the cursor must fingerprint
//! identically regardless of distant context — only the last 200 chars of
//! the prefix and the first 60 chars of the suffix feed the hash.

use sha2::{Digest, Sha256};

/// Non-text separator placed between the tail and head windows so that,
/// e.g., a prefix ending in "ab" and a suffix starting with "c" can't
/// collide with a prefix ending in "a" and a suffix starting with "bc".
const SEPARATOR: char = '\u{241F}';

const TAIL_LEN: usize = 200;
const HEAD_LEN: usize = 60;

fn tail_chars(s: &str, n: usize) -> &str {
    let start = s
        .char_indices()
        .rev()
        .nth(n.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[start..]
}

fn head_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Build the stable fingerprint `provider:model:hash(tail200⧟head60)`.
pub fn fingerprint(provider: &str, model: &str, prefix: &str, suffix: &str) -> String {
    let tail = tail_chars(prefix, TAIL_LEN);
    let head = head_chars(suffix, HEAD_LEN);

    let mut hasher = Sha256::new();
    hasher.update(tail.as_bytes());
    hasher.update(SEPARATOR.to_string().as_bytes());
    hasher.update(head.as_bytes());
    let digest = hasher.finalize();

    format!("{provider}:{model}:{:x}", digest)
}
