use serde::{Deserialize, Serialize};

/// Immutable cursor context: everything before and after the caret.
///
/// Both halves may be empty — an empty prefix means the caret sits at the
/// start of the document, an empty suffix that it sits at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorContext {
    pub prefix: String,
    pub suffix: String,
}

impl CursorContext {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }
}

/// The markdown-ish structural category the cursor sits in.
///
/// Order here matches neither the classifier's priority order (see
/// `context::classify`) nor any serialization requirement, just grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextClass {
    Text,
    Heading,
    BlockQuotes,
    UnorderedList,
    NumberedList,
    CodeBlock,
    MathBlock,
    TaskList,
}

impl ContextClass {
    /// The string tag used to match `FewShotExample::context` against this
    /// class. Unmatched tags in configuration are silently ignored.
    pub fn as_tag(&self) -> &'static str {
        match self {
            ContextClass::Text => "Text",
            ContextClass::Heading => "Heading",
            ContextClass::BlockQuotes => "BlockQuotes",
            ContextClass::UnorderedList => "UnorderedList",
            ContextClass::NumberedList => "NumberedList",
            ContextClass::CodeBlock => "CodeBlock",
            ContextClass::MathBlock => "MathBlock",
            ContextClass::TaskList => "TaskList",
        }
    }
}

/// Role of a participant in a chat-style prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single message in a chat-style prompt sent to an upstream provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters forwarded to whichever upstream provider is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub max_tokens: u32,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            max_tokens: 256,
        }
    }
}

/// A single user/assistant pair injected into the prompt to prime style for
/// a specific [`ContextClass`]. `context` is matched against
/// [`ContextClass::as_tag`] by string equality; examples whose tag doesn't
/// match any class are silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FewShotExample {
    pub context: String,
    pub input: String,
    pub answer: String,
}
