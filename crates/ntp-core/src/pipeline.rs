//! Orchestration glue: preprocess -> classify -> build prompt -> call
//! upstream -> postprocess. One call per completion request, independent of
//! coalescing/caching/rate-limiting, which all live a layer up in the
//! service binary.

use crate::context;
use crate::error::Result;
use crate::postprocess::{self, ChainOfThoughtStripper};
use crate::preprocess::{self, Preprocessor};
use crate::prompt::PromptBuilder;
use crate::providers::UpstreamClient;
use crate::types::CursorContext;

/// Everything `fetch_predictions` needs that isn't per-request: the
/// compiled preprocessor/postprocessor chain, the prompt builder, and the
/// upstream client to dispatch to.
pub struct Pipeline {
    pub preprocessors: Vec<Box<dyn Preprocessor + Send + Sync>>,
    pub prompt_builder: PromptBuilder,
    pub cot_stripper: ChainOfThoughtStripper,
    pub client: UpstreamClient,
}

impl Pipeline {
    /// Runs the full one-shot request. Returns `Ok("")` when a preprocessor
    /// short-circuits the request (the cursor sits somewhere that must never
    /// be completed) — that's a normal empty suggestion, not an error.
    ///
    /// Context is classified once from the caller's original `prefix`/
    /// `suffix`, before any preprocessor rewrites them, and that same class
    /// is reused for post-processing — mirroring the original, which
    /// recomputes context for post-processing from the same untouched
    /// parameters `fetch_predictions` was called with, not the
    /// length-limited/dataview-stripped text the prompt was built from.
    pub async fn fetch_predictions(&self, prefix: &str, suffix: &str) -> Result<String> {
        let context = context::classify(prefix, suffix);

        let ctx = CursorContext::new(prefix, suffix);
        let Some(processed) = preprocess::apply(&self.preprocessors, ctx) else {
            return Ok(String::new());
        };

        let messages = self.prompt_builder.build(&processed.prefix, &processed.suffix, context)?;

        let raw = self.client.query(&messages, &processed).await?;

        postprocess::apply(&self.cot_stripper, prefix, suffix, context, raw)
    }

    /// Streaming counterpart. Yields text chunks as they arrive, falling
    /// back to a single chunk carrying the one-shot result if the stream
    /// opens but never yields. Post-processing only makes sense on a
    /// complete answer, so the caller is expected to buffer chunks and
    /// postprocess once the stream ends — this returns the raw upstream
    /// text stream plus the context needed to do that.
    pub async fn stream_predictions(
        &self,
        prefix: &str,
        suffix: &str,
    ) -> Result<Option<(futures::stream::BoxStream<'static, String>, crate::types::ContextClass)>> {
        let context = context::classify(prefix, suffix);

        let ctx = CursorContext::new(prefix, suffix);
        let Some(processed) = preprocess::apply(&self.preprocessors, ctx) else {
            return Ok(None);
        };

        let messages = self.prompt_builder.build(&processed.prefix, &processed.suffix, context)?;
        let chunks = self.client.stream_with_fallback(&messages, &processed).await;
        Ok(Some((chunks, context)))
    }

    /// Applies the fixed postprocessor chain to a completed streamed answer,
    /// using the same original, pre-preprocessor `prefix`/`suffix` the
    /// one-shot path uses.
    pub fn postprocess(&self, prefix: &str, suffix: &str, context: crate::types::ContextClass, completion: String) -> Result<String> {
        postprocess::apply(&self.cot_stripper, prefix, suffix, context, completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::{DataviewRemover, LengthLimiter};
    use crate::providers::{GeminiClient, UpstreamClient};
    use crate::types::ModelOptions;

    fn test_pipeline() -> Pipeline {
        Pipeline {
            preprocessors: vec![
                Box::new(DataviewRemover::new()),
                Box::new(LengthLimiter::default()),
            ],
            prompt_builder: PromptBuilder::default(),
            cot_stripper: ChainOfThoughtStripper::default(),
            client: UpstreamClient::Gemini(GeminiClient {
                api_key: String::new(),
                model: "gemini-1.5-flash".to_string(),
                options: ModelOptions::default(),
            }),
        }
    }

    #[tokio::test]
    async fn short_circuits_to_empty_inside_dataview_block() {
        let pipeline = test_pipeline();
        let result = pipeline
            .fetch_predictions("```dataview\nlist from", "\n```\nrest")
            .await
            .unwrap();
        assert_eq!(result, "");
    }
}
