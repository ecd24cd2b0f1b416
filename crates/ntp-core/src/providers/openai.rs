//! OpenAI Responses API client: `POST {url}` with a Bearer token and the
//! `input` item-list shape (not the older `messages` chat-completions body).

use futures::stream::{self, BoxStream, StreamExt};
use futures::TryStreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde_json::{json, Value};

use crate::error::{PipelineError, Result};
use crate::outbound::CLIENT;
use crate::types::{ChatMessage, ChatRole, ModelOptions};

pub struct OpenAiClient {
    pub api_key: String,
    pub url: String,
    pub model: String,
    pub options: ModelOptions,
}

fn to_input_items(messages: &[ChatMessage]) -> Value {
    let items: Vec<Value> = messages
        .iter()
        .map(|m| {
            json!({
                "role": role_str(m.role),
                "content": [{"type": "input_text", "text": m.content}],
            })
        })
        .collect();
    Value::Array(items)
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

/// Prefers the aggregated `output_text` field; otherwise walks `output[]`
/// items looking for `type: "output_text"` or `type: "message"` content.
fn extract_output_text(payload: &Value) -> String {
    if let Some(text) = payload.get("output_text").and_then(Value::as_str) {
        return text.to_string();
    }

    let mut texts = Vec::new();
    if let Some(out) = payload.get("output").and_then(Value::as_array) {
        for item in out {
            if item.get("type").and_then(Value::as_str) == Some("output_text") {
                if let Some(t) = item.get("text").and_then(Value::as_str) {
                    texts.push(t.to_string());
                }
            }
            if item.get("type").and_then(Value::as_str) == Some("message") {
                if let Some(content) = item.get("content").and_then(Value::as_array) {
                    for c in content {
                        if let Some(t) = c.get("text").and_then(Value::as_str) {
                            texts.push(t.to_string());
                        }
                    }
                }
            }
        }
    }
    texts.join("")
}

impl OpenAiClient {
    fn body(&self, messages: &[ChatMessage], stream: bool) -> Value {
        json!({
            "model": self.model,
            "input": to_input_items(messages),
            "temperature": self.options.temperature,
            "top_p": self.options.top_p,
            "frequency_penalty": self.options.frequency_penalty,
            "presence_penalty": self.options.presence_penalty,
            "max_output_tokens": self.options.max_tokens,
            "stream": stream,
        })
    }

    pub async fn query(&self, messages: &[ChatMessage]) -> Result<String> {
        let resp = CLIENT
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.body(messages, false))
            .send()
            .await?;
        if resp.status().as_u16() >= 400 {
            return Err(PipelineError::Upstream(format!(
                "openai responses api returned {}",
                resp.status()
            )));
        }
        let payload: Value = resp.json().await?;
        Ok(extract_output_text(&payload))
    }

    pub fn stream(&self, messages: &[ChatMessage]) -> BoxStream<'static, String> {
        let request = CLIENT
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(&self.body(messages, true));

        let Ok(source) = EventSource::new(request) else {
            return stream::empty().boxed();
        };

        stream::unfold(source, move |mut source| async move {
            loop {
                match source.try_next().await {
                    Ok(Some(Event::Message(msg))) => {
                        if msg.data == "[DONE]" {
                            return None;
                        }
                        let Ok(obj): std::result::Result<Value, _> = serde_json::from_str(&msg.data)
                        else {
                            continue;
                        };
                        let kind = obj
                            .get("type")
                            .or_else(|| obj.get("event"))
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string();
                        match kind.as_str() {
                            "response.output_text.delta" | "output_text.delta" => {
                                if let Some(t) = obj
                                    .get("delta")
                                    .and_then(|d| d.get("text"))
                                    .and_then(Value::as_str)
                                    .or_else(|| obj.get("output_text").and_then(Value::as_str))
                                {
                                    return Some((t.to_string(), source));
                                }
                            }
                            "message" => {
                                if let Some(content) = obj.get("content").and_then(Value::as_array) {
                                    let joined: String = content
                                        .iter()
                                        .filter_map(|c| c.get("text").and_then(Value::as_str))
                                        .collect();
                                    if !joined.is_empty() {
                                        return Some((joined, source));
                                    }
                                }
                            }
                            "response.completed" | "error" => return None,
                            _ => {}
                        }
                    }
                    Ok(Some(Event::Open)) => continue,
                    Ok(None) | Err(_) => return None,
                }
            }
        })
        .boxed()
    }

    pub async fn check_config(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.url.is_empty() {
            errors.push("OpenAI Responses API url is not set".to_string());
        }
        if self.api_key.is_empty() {
            errors.push("OpenAI API key is not set".to_string());
        }
        if !errors.is_empty() {
            return errors;
        }
        let probe = vec![ChatMessage::user("Say hello world and nothing else.")];
        if let Err(e) = self.query(&probe).await {
            errors.push(e.to_string());
        }
        errors
    }
}
