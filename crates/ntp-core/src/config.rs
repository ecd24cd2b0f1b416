//! Settings loading: read a TOML config file, falling back to built-in
//! defaults field-for-field, and turn it into a runnable [`Pipeline`].
//!
//! Reads the file, dispatches on extension, and wraps I/O errors in
//! `anyhow::Context`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::postprocess::ChainOfThoughtStripper;
use crate::preprocess::{DataviewRemover, LengthLimiter, Preprocessor};
use crate::prompt::{PromptBuilder, DEFAULT_SYSTEM_MESSAGE, DEFAULT_USER_TEMPLATE};
use crate::providers::{GeminiClient, OpenAiClient, OpenRouterClient, UpstreamClient};
use crate::types::{FewShotExample, ModelOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    OpenAi,
    OpenRouter,
    Gemini,
}

impl Default for ApiProvider {
    fn default() -> Self {
        ApiProvider::Gemini
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub key: String,
    pub url: String,
    pub model: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            key: String::new(),
            url: "https://api.openai.com/v1/responses".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouterSettings {
    pub key: String,
    pub url: String,
    pub model: String,
    pub site_url: Option<String>,
    pub app_title: Option<String>,
}

impl Default for OpenRouterSettings {
    fn default() -> Self {
        Self {
            key: String::new(),
            url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            site_url: None,
            app_title: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub key: String,
    pub model: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            key: String::new(),
            model: "gemini-2.5-flash".to_string(),
        }
    }
}

fn default_few_shots() -> Vec<FewShotExample> {
    vec![
        FewShotExample {
            context: "Text".to_string(),
            input: "PREFIX: The quick brown <mask/> SUFFIX: over the lazy dog.".to_string(),
            answer: "fox jumps ".to_string(),
        },
        FewShotExample {
            context: "Text".to_string(),
            input: "PREFIX: In conclusion, we find that <mask/> SUFFIX: . Therefore, future work should..."
                .to_string(),
            answer: "the proposed method outperforms baselines by a wide margin".to_string(),
        },
    ]
}

fn default_true() -> bool {
    true
}

fn default_max_prefix() -> usize {
    5000
}

fn default_max_suffix() -> usize {
    500
}

fn default_stream_min_chars() -> usize {
    8
}

fn default_stream_throttle_ms() -> u64 {
    40
}

/// Mirrors `original_source/src/settings.py::Settings` field-for-field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_provider: ApiProvider,
    pub openai: OpenAiSettings,
    pub openrouter: OpenRouterSettings,
    pub gemini: GeminiSettings,

    pub model_options: ModelOptions,
    pub system_message: String,
    pub user_message_template: String,
    /// `None` means disabled, the same way the original's always-fails
    /// `(?!)` pattern behaves — see `ChainOfThoughtStripper`.
    pub chain_of_thought_removal_regex: Option<String>,
    pub few_shot_examples: Vec<FewShotExample>,

    pub dont_include_dataviews: bool,
    pub max_prefix_char_limit: usize,
    pub max_suffix_char_limit: usize,

    pub remove_duplicate_math_block_indicator: bool,
    pub remove_duplicate_code_block_indicator: bool,
    pub debug_mode: bool,

    pub enable_streaming: bool,
    pub stream_min_chars_before_emit: usize,
    pub stream_emit_on_boundary: bool,
    pub stream_throttle_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_provider: ApiProvider::default(),
            openai: OpenAiSettings::default(),
            openrouter: OpenRouterSettings::default(),
            gemini: GeminiSettings::default(),
            model_options: ModelOptions::default(),
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            user_message_template: DEFAULT_USER_TEMPLATE.to_string(),
            chain_of_thought_removal_regex: None,
            few_shot_examples: default_few_shots(),
            dont_include_dataviews: default_true(),
            max_prefix_char_limit: default_max_prefix(),
            max_suffix_char_limit: default_max_suffix(),
            remove_duplicate_math_block_indicator: default_true(),
            remove_duplicate_code_block_indicator: default_true(),
            debug_mode: false,
            enable_streaming: false,
            stream_min_chars_before_emit: default_stream_min_chars(),
            stream_emit_on_boundary: default_true(),
            stream_throttle_ms: default_stream_throttle_ms(),
        }
    }
}

impl Settings {
    /// Reads `path`, dispatching on extension; only `.toml` is supported —
    /// the original ships a single pydantic model with no multi-format
    /// loader, and `toml` is the only format crate already in the
    /// workspace dependency table.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let content = std::fs::read_to_string(p)
            .with_context(|| format!("failed to read config file at {}", p.display()))?;
        let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "toml" => toml::from_str(&content).with_context(|| format!("failed to parse {}", p.display())),
            other => Err(anyhow::anyhow!("unsupported config format: {other}")),
        }
    }

    fn gemini_key(&self) -> String {
        if !self.gemini.key.is_empty() {
            return self.gemini.key.clone();
        }
        std::env::var("GOOGLE_API_KEY").unwrap_or_default()
    }

    fn build_client(&self) -> UpstreamClient {
        match self.api_provider {
            ApiProvider::OpenAi => UpstreamClient::OpenAi(OpenAiClient {
                api_key: self.openai.key.clone(),
                url: self.openai.url.clone(),
                model: self.openai.model.clone(),
                options: self.model_options.clone(),
            }),
            ApiProvider::OpenRouter => UpstreamClient::OpenRouter(OpenRouterClient {
                api_key: self.openrouter.key.clone(),
                url: self.openrouter.url.clone(),
                model: self.openrouter.model.clone(),
                options: self.model_options.clone(),
                site_url: self.openrouter.site_url.clone(),
                app_title: self.openrouter.app_title.clone(),
            }),
            ApiProvider::Gemini => UpstreamClient::Gemini(GeminiClient {
                api_key: self.gemini_key(),
                model: self.gemini.model.clone(),
                options: self.model_options.clone(),
            }),
        }
    }

    /// Assembles the preprocessor chain, prompt builder, CoT stripper and
    /// upstream client into a runnable [`Pipeline`].
    pub fn build_pipeline(&self) -> Result<Pipeline> {
        let mut preprocessors: Vec<Box<dyn Preprocessor + Send + Sync>> = Vec::new();
        if self.dont_include_dataviews {
            preprocessors.push(Box::new(DataviewRemover::new()));
        }
        preprocessors.push(Box::new(LengthLimiter::new(
            self.max_prefix_char_limit,
            self.max_suffix_char_limit,
        )));

        let cot_stripper = match &self.chain_of_thought_removal_regex {
            Some(pattern) => ChainOfThoughtStripper::from_str(pattern)
                .with_context(|| format!("invalid chain_of_thought_removal_regex: {pattern}"))?,
            None => ChainOfThoughtStripper::default(),
        };

        let prompt_builder = PromptBuilder::new(
            self.system_message.clone(),
            self.user_message_template.clone(),
            self.few_shot_examples.clone(),
        );

        Ok(Pipeline {
            preprocessors,
            prompt_builder,
            cot_stripper,
            client: self.build_client(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_settings_module() {
        let s = Settings::default();
        assert_eq!(s.api_provider, ApiProvider::Gemini);
        assert_eq!(s.max_prefix_char_limit, 5000);
        assert_eq!(s.max_suffix_char_limit, 500);
        assert_eq!(s.few_shot_examples.len(), 2);
        assert!(s.chain_of_thought_removal_regex.is_none());
        assert_eq!(s.stream_min_chars_before_emit, 8);
        assert_eq!(s.stream_throttle_ms, 40);
    }

    #[test]
    fn loads_toml_and_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            api_provider = "openai"
            [openai]
            key = "sk-test"
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();

        let settings = Settings::from_path(&path).unwrap();
        assert_eq!(settings.api_provider, ApiProvider::OpenAi);
        assert_eq!(settings.openai.key, "sk-test");
        // unspecified fields keep their defaults
        assert_eq!(settings.max_prefix_char_limit, 5000);
    }

    #[test]
    fn rejects_unsupported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "api_provider: gemini").unwrap();
        assert!(Settings::from_path(&path).is_err());
    }

    #[test]
    fn gemini_key_falls_back_to_environment() {
        let mut settings = Settings::default();
        settings.gemini.key = String::new();
        std::env::set_var("GOOGLE_API_KEY", "env-key");
        assert_eq!(settings.gemini_key(), "env-key");
        std::env::remove_var("GOOGLE_API_KEY");
    }
}
