use crate::types::ContextClass;

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '»', '”'];

/// Trims whitespace the model may have added where the surrounding text
/// already supplies a boundary. Applies to every context except CodeBlock
/// and BlockQuotes, where whitespace is often structurally significant.
pub struct RemoveWhitespace;

impl RemoveWhitespace {
    pub fn process(
        &self,
        prefix: &str,
        suffix: &str,
        context: ContextClass,
        completion: String,
    ) -> String {
        let applies = matches!(
            context,
            ContextClass::Text
                | ContextClass::Heading
                | ContextClass::MathBlock
                | ContextClass::TaskList
                | ContextClass::NumberedList
                | ContextClass::UnorderedList
        );
        if !applies {
            return completion;
        }

        let mut text = completion;
        if prefix.ends_with([' ', '\t', '\n']) || suffix.starts_with('\n') {
            text = text.trim_start().to_string();
        }
        if suffix.chars().next().is_some_and(|c| TRAILING_PUNCTUATION.contains(&c)) {
            text = text.trim_end().to_string();
        }
        text
    }
}
