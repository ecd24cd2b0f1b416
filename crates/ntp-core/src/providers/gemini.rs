//! Gemini client over the raw `generateContent` / `streamGenerateContent`
//! REST endpoints — there is no Gemini Rust SDK anywhere in the corpus this
//! crate draws from, so this talks to the same hosted API a native SDK
//! would, through the shared [`CLIENT`].
//!
//! Preserves the original's adaptive token budget and stop-sequence
//! heuristics: a short, suffix-aware `max_output_tokens` keeps the model
//! from overrunning past the insertion point, and stop sequences built from
//! the suffix's head bias it to actually stop there.

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Value};

use crate::error::{PipelineError, Result};
use crate::outbound::CLIENT;
use crate::types::{ChatMessage, ChatRole, CursorContext, ModelOptions};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiClient {
    pub api_key: String,
    pub model: String,
    pub options: ModelOptions,
}

struct Contents {
    system_instruction: String,
    contents: Vec<Value>,
}

fn to_contents(messages: &[ChatMessage]) -> Contents {
    let mut system_texts = Vec::new();
    let mut contents = Vec::new();
    for m in messages {
        match m.role {
            ChatRole::System => {
                if !m.content.is_empty() {
                    system_texts.push(m.content.clone());
                }
            }
            ChatRole::User => contents.push(json!({
                "role": "user",
                "parts": [{"text": m.content}],
            })),
            ChatRole::Assistant => contents.push(json!({
                "role": "model",
                "parts": [{"text": m.content}],
            })),
        }
    }
    Contents {
        system_instruction: system_texts.join("\n\n").trim().to_string(),
        contents,
    }
}

/// Approximates 4 chars/token with a +24 bias so generation reaches a
/// natural boundary instead of stopping mid-phrase.
fn target_tokens(suffix: &str, base_cap: u32) -> u32 {
    let suffix_len = suffix.chars().count().min(200) as u32;
    let need = suffix_len / 4 + 24;
    let floor = if suffix.is_empty() { 64 } else { 48 };
    base_cap.min(need.max(floor))
}

fn stop_sequences(suffix: &str) -> Vec<String> {
    let mut stops = Vec::new();
    let head16: String = suffix.chars().take(16).collect::<String>().trim().to_string();
    let head8: String = suffix.chars().take(8).collect::<String>().trim().to_string();
    for h in [head16, head8] {
        if h.chars().count() >= 2 {
            stops.push(h);
        }
    }
    if !suffix.trim().is_empty() {
        stops.push("\n\n".to_string());
        stops.push("\n- ".to_string());
        stops.push("\n1. ".to_string());
    }
    stops
}

fn extract_text(payload: &Value) -> String {
    if let Some(candidates) = payload.get("candidates").and_then(Value::as_array) {
        for c in candidates {
            if let Some(parts) = c.pointer("/content/parts").and_then(Value::as_array) {
                let joined: String = parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect();
                let trimmed = joined.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }
    String::new()
}

impl GeminiClient {
    fn generate_config(&self, max_tokens: u32, stop: Vec<String>, system_instruction: &str) -> Value {
        let mut config = json!({
            "temperature": self.options.temperature.min(0.4),
            "topP": self.options.top_p,
            "presencePenalty": self.options.presence_penalty,
            "frequencyPenalty": self.options.frequency_penalty,
            "maxOutputTokens": max_tokens,
            "candidateCount": 1,
            "stopSequences": stop,
        });
        if !system_instruction.is_empty() {
            config["systemInstruction"] = json!({"parts": [{"text": system_instruction}]});
        }
        config
    }

    pub async fn query(&self, messages: &[ChatMessage], ctx: &CursorContext) -> Result<String> {
        let Contents {
            system_instruction,
            contents,
        } = to_contents(messages);

        let base_cap = self.options.max_tokens.min(128);
        let max_tokens = target_tokens(&ctx.suffix, base_cap);
        let stop = stop_sequences(&ctx.suffix);

        let url = format!(
            "{GEMINI_API_BASE}/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = json!({
            "contents": contents,
            "generationConfig": self.generate_config(max_tokens, stop, &system_instruction),
        });
        let resp = CLIENT.post(&url).json(&body).send().await?;
        if resp.status().as_u16() >= 400 {
            return Err(PipelineError::Upstream(format!(
                "gemini returned {}",
                resp.status()
            )));
        }
        let payload: Value = resp.json().await?;
        Ok(extract_text(&payload))
    }

    pub fn stream(&self, messages: &[ChatMessage], _ctx: &CursorContext) -> BoxStream<'static, String> {
        let Contents {
            system_instruction,
            contents,
        } = to_contents(messages);
        let max_tokens = self.options.max_tokens;
        let body = json!({
            "contents": contents,
            "generationConfig": self.generate_config(max_tokens, Vec::new(), &system_instruction),
        });
        let url = format!(
            "{GEMINI_API_BASE}/{}:streamGenerateContent?alt=sse&key={}",
            self.model, self.api_key
        );

        let request = CLIENT.post(&url).json(&body);
        let Ok(source) = reqwest_eventsource::EventSource::new(request) else {
            return stream::empty().boxed();
        };
        parse_gemini_sse(source)
    }

    pub async fn check_config(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.api_key.is_empty() {
            errors.push("Gemini API key is not set".to_string());
        }
        if !errors.is_empty() {
            return errors;
        }
        let probe = vec![ChatMessage::user("Say hello world and nothing else.")];
        if let Err(e) = self.query(&probe, &CursorContext::new("", "")).await {
            errors.push(e.to_string());
        }
        errors
    }
}

fn parse_gemini_sse(source: reqwest_eventsource::EventSource) -> BoxStream<'static, String> {
    use futures::TryStreamExt;
    use reqwest_eventsource::Event;

    stream::unfold(source, move |mut source| async move {
        loop {
            match source.try_next().await {
                Ok(Some(Event::Message(msg))) => {
                    let Ok(obj): std::result::Result<Value, _> = serde_json::from_str(&msg.data) else {
                        continue;
                    };
                    let text = extract_text(&obj);
                    if !text.is_empty() {
                        return Some((text, source));
                    }
                }
                Ok(Some(Event::Open)) => continue,
                Ok(None) | Err(_) => return None,
            }
        }
    })
    .boxed()
}
