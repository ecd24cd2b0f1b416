use std::sync::LazyLock;

use regex::Regex;

use crate::types::ContextClass;

static MATH_DELIM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n?\$\$\n?").unwrap());
static CODE_OPEN_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[a-zA-Z]+[ \t]*\n?").unwrap());
static CODE_CLOSE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n?```[ \t]*\n?").unwrap());

/// Strips `$$` block-math delimiters and stray `$` when the surrounding
/// context is [`ContextClass::MathBlock`]; a no-op otherwise, since a model
/// asked for LaTeX-only output may still echo the fence it was shown.
pub struct RemoveMathIndicators;

impl RemoveMathIndicators {
    pub fn process(&self, context: ContextClass, completion: String) -> String {
        if context != ContextClass::MathBlock {
            return completion;
        }
        let without_delims = MATH_DELIM_RE.replace_all(&completion, "");
        without_delims.replace('$', "")
    }
}

/// Strips an opening fence with optional language tag, a closing fence, and
/// stray backticks, when the context is [`ContextClass::CodeBlock`].
pub struct RemoveCodeIndicators;

impl RemoveCodeIndicators {
    pub fn process(&self, context: ContextClass, completion: String) -> String {
        if context != ContextClass::CodeBlock {
            return completion;
        }
        let step1 = CODE_OPEN_FENCE_RE.replace_all(&completion, "");
        let step2 = CODE_CLOSE_FENCE_RE.replace_all(&step1, "");
        step2.replace('`', "")
    }
}
