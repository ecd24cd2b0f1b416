use regex::Regex;

/// Strips portions of a completion matching a configured chain-of-thought
/// pattern (e.g. `<think>...</think>` reasoning traces some models emit).
///
/// Disabled by default, matching the original's always-fails default
/// pattern — the `regex` crate has no lookaround to express that literally,
/// so absence of a pattern is modeled as `None` instead.
pub struct ChainOfThoughtStripper {
    pattern: Option<Regex>,
}

impl Default for ChainOfThoughtStripper {
    fn default() -> Self {
        Self { pattern: None }
    }
}

impl ChainOfThoughtStripper {
    pub fn new(pattern: Option<Regex>) -> Self {
        Self { pattern }
    }

    pub fn from_str(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Some(Regex::new(pattern)?),
        })
    }

    pub fn process(&self, completion: String) -> String {
        match &self.pattern {
            Some(re) if re.is_match(&completion) => re.replace_all(&completion, "").into_owned(),
            _ => completion,
        }
    }
}
