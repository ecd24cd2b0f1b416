//! OpenRouter client: standard chat-completions shape, with optional
//! `HTTP-Referer`/`X-Title` attribution headers.

use futures::stream::{self, BoxStream, StreamExt};
use futures::TryStreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde_json::{json, Value};

use crate::error::{PipelineError, Result};
use crate::outbound::CLIENT;
use crate::types::{ChatMessage, ChatRole, ModelOptions};

pub struct OpenRouterClient {
    pub api_key: String,
    pub url: String,
    pub model: String,
    pub options: ModelOptions,
    pub site_url: Option<String>,
    pub app_title: Option<String>,
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

fn to_messages(messages: &[ChatMessage]) -> Value {
    Value::Array(
        messages
            .iter()
            .map(|m| json!({"role": role_str(m.role), "content": m.content}))
            .collect(),
    )
}

impl OpenRouterClient {
    fn body(&self, messages: &[ChatMessage], stream: bool) -> Value {
        json!({
            "model": self.model,
            "messages": to_messages(messages),
            "stream": stream,
            "temperature": self.options.temperature,
            "top_p": self.options.top_p,
            "frequency_penalty": self.options.frequency_penalty,
            "presence_penalty": self.options.presence_penalty,
            "max_tokens": self.options.max_tokens,
        })
    }

    fn request(&self, messages: &[ChatMessage], stream: bool) -> reqwest::RequestBuilder {
        let mut req = CLIENT
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.body(messages, stream));
        if let Some(site) = &self.site_url {
            req = req.header("HTTP-Referer", site);
        }
        if let Some(title) = &self.app_title {
            req = req.header("X-Title", title);
        }
        req
    }

    pub async fn query(&self, messages: &[ChatMessage]) -> Result<String> {
        let resp = self.request(messages, false).send().await?;
        if resp.status().as_u16() >= 400 {
            return Err(PipelineError::Upstream(format!(
                "openrouter returned {}",
                resp.status()
            )));
        }
        let payload: Value = resp.json().await?;
        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .ok_or_else(|| PipelineError::Upstream("malformed openrouter response".to_string()))
    }

    pub fn stream(&self, messages: &[ChatMessage]) -> BoxStream<'static, String> {
        let request = self.request(messages, true);
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
                        if let Some(delta) = obj
                            .pointer("/choices/0/delta/content")
                            .and_then(Value::as_str)
                        {
                            if !delta.is_empty() {
                                return Some((delta.to_string(), source));
                            }
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
            errors.push("OpenRouter API url is not set".to_string());
        }
        if self.api_key.is_empty() {
            errors.push("OpenRouter API key is not set".to_string());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_messages_with_lowercase_roles() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::assistant("a")];
        let value = to_messages(&messages);
        assert_eq!(value[0]["role"], "system");
        assert_eq!(value[1]["role"], "assistant");
    }
}
