//! Prompt assembly: system message specialization, few-shot injection, and
//! strict-undefined user-message templating.
//!
//! Template rendering uses [`minijinja`] with [`UndefinedBehavior::Strict`]
//! set directly — this template only ever takes `prefix` and `suffix`, so
//! referencing anything else is a render-time error, the same way Jinja2's
//! `StrictUndefined` would raise one.

use minijinja::{context, Environment, UndefinedBehavior};

use crate::error::Result;
use crate::types::{ChatMessage, ContextClass, FewShotExample};

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You insert text at <mask/> so the combined document reads naturally. \
Use BOTH the prefix and suffix as context. Output only the text to insert. \
Do not repeat what is already present in the prefix. Avoid reprinting the suffix. \
Do not output only whitespace. If unsure, produce a short continuation (2-8 words).";

pub const DEFAULT_USER_TEMPLATE: &str = "Insert text at <mask/> so the final text flows from <prefix/> to <suffix/>.\n\
<prefix/>\n{{ prefix }}\n</prefix/>\n\
<mask/>\n\
<suffix/>\n{{ suffix }}\n</suffix/>\n\
Return ONLY the insertion.";

fn system_suffix_for(context: ContextClass) -> &'static str {
    match context {
        ContextClass::Text => {
            "\n\nThe <mask/> is in a paragraph; complete it naturally in the same language without overlap."
        }
        ContextClass::Heading => "\n\nThe <mask/> is in a heading; complete the title to fit the content.",
        ContextClass::BlockQuotes => "\n\nThe <mask/> is within a quote; complete it to fit the context.",
        ContextClass::UnorderedList => {
            "\n\nThe <mask/> is in an unordered list; add item(s) that fit, no overlap."
        }
        ContextClass::NumberedList => {
            "\n\nThe <mask/> is in a numbered list; add item(s) that fit sequence/context."
        }
        ContextClass::CodeBlock => {
            "\n\nThe <mask/> is in a code block; complete in the same language and support surrounding text."
        }
        ContextClass::MathBlock => "\n\nThe <mask/> is in a math block; output only LaTeX (no prose).",
        ContextClass::TaskList => "\n\nThe <mask/> is in a task list; add logical (sub)tasks.",
    }
}

pub struct PromptBuilder {
    system_message: String,
    user_template: String,
    few_shot_examples: Vec<FewShotExample>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_MESSAGE, DEFAULT_USER_TEMPLATE, Vec::new())
    }
}

impl PromptBuilder {
    pub fn new(
        system_message: impl Into<String>,
        user_template: impl Into<String>,
        few_shot_examples: Vec<FewShotExample>,
    ) -> Self {
        Self {
            system_message: system_message.into(),
            user_template: user_template.into(),
            few_shot_examples,
        }
    }

    /// Build the ordered `[system, few_shot…, user]` message sequence.
    pub fn build(&self, prefix: &str, suffix: &str, context: ContextClass) -> Result<Vec<ChatMessage>> {
        let system = format!("{}{}", self.system_message, system_suffix_for(context));

        let mut messages = vec![ChatMessage::system(system)];

        let tag = context.as_tag();
        for example in &self.few_shot_examples {
            if example.context == tag {
                messages.push(ChatMessage::user(example.input.clone()));
                messages.push(ChatMessage::assistant(example.answer.clone()));
            }
        }

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        let tmpl = env.template_from_str(&self.user_template)?;
        let rendered = tmpl.render(context! { prefix => prefix, suffix => suffix })?;
        messages.push(ChatMessage::user(rendered));

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_default_three_message_prompt() {
        let builder = PromptBuilder::default();
        let messages = builder.build("before", "after", ContextClass::Text).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("before"));
        assert!(messages[1].content.contains("after"));
    }

    #[test]
    fn system_message_carries_context_specific_suffix() {
        let builder = PromptBuilder::default();
        let messages = builder.build("", "", ContextClass::MathBlock).unwrap();
        assert!(messages[0].content.contains("LaTeX"));
    }

    #[test]
    fn injects_matching_few_shot_examples_only() {
        let examples = vec![
            FewShotExample {
                context: "Text".to_string(),
                input: "ex input".to_string(),
                answer: "ex answer".to_string(),
            },
            FewShotExample {
                context: "MathBlock".to_string(),
                input: "math input".to_string(),
                answer: "math answer".to_string(),
            },
        ];
        let builder = PromptBuilder::new(DEFAULT_SYSTEM_MESSAGE, DEFAULT_USER_TEMPLATE, examples);
        let messages = builder.build("p", "s", ContextClass::Text).unwrap();
        // system + one few-shot pair + user = 4
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "ex input");
        assert_eq!(messages[2].content, "ex answer");
    }

    #[test]
    fn unmatched_few_shot_tags_are_silently_ignored() {
        let examples = vec![FewShotExample {
            context: "NotARealTag".to_string(),
            input: "x".to_string(),
            answer: "y".to_string(),
        }];
        let builder = PromptBuilder::new(DEFAULT_SYSTEM_MESSAGE, DEFAULT_USER_TEMPLATE, examples);
        let messages = builder.build("p", "s", ContextClass::Text).unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn rejects_template_referencing_unknown_variable() {
        let builder = PromptBuilder::new(DEFAULT_SYSTEM_MESSAGE, "{{ not_a_real_var }}", Vec::new());
        assert!(builder.build("p", "s", ContextClass::Text).is_err());
    }
}
