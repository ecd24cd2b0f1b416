//! Polymorphic upstream client, modeled as a sum type over the three
//! supported providers rather than a trait object — there are exactly
//! three shapes, known at config-load time, and a `match` reads better than
//! a vtable for something this small.

mod gemini;
mod openai;
mod openrouter;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use openrouter::OpenRouterClient;

use futures::stream::{self, BoxStream, StreamExt};

use crate::error::Result;
use crate::types::{ChatMessage, CursorContext};

pub enum UpstreamClient {
    OpenAi(OpenAiClient),
    OpenRouter(OpenRouterClient),
    Gemini(GeminiClient),
}

impl UpstreamClient {
    pub async fn query(&self, messages: &[ChatMessage], ctx: &CursorContext) -> Result<String> {
        match self {
            UpstreamClient::OpenAi(c) => c.query(messages).await,
            UpstreamClient::OpenRouter(c) => c.query(messages).await,
            UpstreamClient::Gemini(c) => c.query(messages, ctx).await,
        }
    }

    fn stream(&self, messages: &[ChatMessage], ctx: &CursorContext) -> BoxStream<'static, String> {
        match self {
            UpstreamClient::OpenAi(c) => c.stream(messages),
            UpstreamClient::OpenRouter(c) => c.stream(messages),
            UpstreamClient::Gemini(c) => c.stream(messages, ctx),
        }
    }

    /// Lazy sequence of text chunks. If the stream opens but yields nothing
    /// before ending — the upstream raised or returned an error status
    /// before the first chunk — falls back to a one-shot `query` and emits
    /// its complete text as a single chunk.
    pub async fn stream_with_fallback(
        &self,
        messages: &[ChatMessage],
        ctx: &CursorContext,
    ) -> BoxStream<'static, String> {
        let mut raw = self.stream(messages, ctx);
        match raw.next().await {
            Some(first) => stream::once(async move { first }).chain(raw).boxed(),
            None => match self.query(messages, ctx).await {
                Ok(text) if !text.is_empty() => stream::once(async move { text }).boxed(),
                _ => stream::empty().boxed(),
            },
        }
    }

    pub async fn check_config(&self) -> Vec<String> {
        match self {
            UpstreamClient::OpenAi(c) => c.check_config().await,
            UpstreamClient::OpenRouter(c) => c.check_config().await,
            UpstreamClient::Gemini(c) => c.check_config().await,
        }
    }
}
