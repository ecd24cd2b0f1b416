/// Removes duplication between a completion and the text already on either
/// side of the cursor: word-boundary overlaps first, then leftover
/// single-character overlaps.
pub struct RemoveOverlap;

impl RemoveOverlap {
    pub fn process(&self, prefix: &str, suffix: &str, completion: String) -> String {
        let mut text = remove_word_overlap_prefix(prefix, completion);
        text = remove_word_overlap_suffix(text, suffix);
        text = remove_char_overlap_prefix(prefix, text);
        text = remove_char_overlap_suffix(text, suffix);
        text
    }
}

/// Word-boundary start positions: index 0 (if non-whitespace) and every
/// index immediately following whitespace.
fn word_starts(text: &str) -> Vec<usize> {
    let chars: Vec<char> = text.chars().collect();
    let mut starts = Vec::new();
    if let Some(&first) = chars.first() {
        if !first.is_whitespace() {
            starts.push(0);
        }
    }
    for i in 1..chars.len() {
        if chars[i - 1].is_whitespace() && !chars[i].is_whitespace() {
            starts.push(i);
        }
    }
    starts
}

fn char_at(text: &str, idx: usize) -> &str {
    let byte_idx = text
        .char_indices()
        .nth(idx)
        .map(|(b, _)| b)
        .unwrap_or(text.len());
    &text[byte_idx..]
}

/// Checks word-boundary tails of `prefix` from shortest to longest against
/// the start of `completion`; the first that matches is removed once.
fn remove_word_overlap_prefix(prefix: &str, completion: String) -> String {
    let right_trimmed = completion.trim_start();
    let starts = word_starts(prefix);
    for &idx in starts.iter().rev() {
        let left_sub = char_at(prefix, idx);
        if let Some(rest) = right_trimmed.strip_prefix(left_sub) {
            return rest.to_string();
        }
    }
    completion
}

/// Checks word-boundary tails of `completion` from shortest to longest
/// against the start of `suffix`; the first that matches truncates
/// `completion` there.
fn remove_word_overlap_suffix(completion: String, suffix: &str) -> String {
    let suffix_trimmed = suffix.trim_start();
    let starts = word_starts(&completion);
    for &idx in starts.iter().rev() {
        let comp_sub = char_at(&completion, idx);
        if suffix_trimmed.starts_with(comp_sub) {
            let byte_idx = completion
                .char_indices()
                .nth(idx)
                .map(|(b, _)| b)
                .unwrap_or(completion.len());
            return completion[..byte_idx].to_string();
        }
    }
    completion
}

fn remove_char_overlap_prefix(prefix: &str, completion: String) -> String {
    let prefix_chars: Vec<char> = prefix.chars().collect();
    let mut comp_chars: Vec<char> = completion.chars().collect();
    let mut i = prefix_chars.len() as isize - 1;
    while !comp_chars.is_empty() && i >= 0 && comp_chars[0] == prefix_chars[i as usize] {
        comp_chars.remove(0);
        i -= 1;
    }
    comp_chars.into_iter().collect()
}

fn remove_char_overlap_suffix(completion: String, suffix: &str) -> String {
    let suffix_chars: Vec<char> = suffix.chars().collect();
    let mut comp_chars: Vec<char> = completion.chars().collect();
    let mut i = 0usize;
    while !comp_chars.is_empty() && i < suffix_chars.len() && *comp_chars.last().unwrap() == suffix_chars[i] {
        comp_chars.pop();
        i += 1;
    }
    comp_chars.into_iter().collect()
}
