//! Text-generation and embedding backends.
//!
//! Workflow nodes never talk to a backend directly: they hold a
//! [`LanguageModel`], which pins the model name and temperature from config
//! and offers free-text generation plus structured (JSON) assessment.

pub mod gemini;
pub mod ollama;
pub mod traits;

use anyhow::Context;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::config::{ProviderConfig, ProviderKind};

#[allow(unused_imports)]
pub use gemini::{GeminiEmbedder, GeminiProvider};
#[allow(unused_imports)]
pub use ollama::{OllamaEmbedder, OllamaProvider};
pub use traits::{Embedder, Provider};

/// Build the configured text-generation backend.
pub fn create_provider(config: &ProviderConfig) -> anyhow::Result<Arc<dyn Provider>> {
    match config.kind {
        ProviderKind::Gemini => {
            let key = require_api_key(config)?;
            Ok(Arc::new(GeminiProvider::new(
                key,
                config.base_url.as_deref(),
                config.timeout_secs,
            )))
        }
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(
            config.base_url.as_deref(),
            config.timeout_secs,
        ))),
    }
}

/// Build the embedder matching the configured backend.
pub fn create_embedder(
    config: &ProviderConfig,
    embedding_model: Option<&str>,
) -> anyhow::Result<Arc<dyn Embedder>> {
    match config.kind {
        ProviderKind::Gemini => {
            let key = require_api_key(config)?;
            Ok(Arc::new(GeminiEmbedder::new(
                key,
                embedding_model,
                config.base_url.as_deref(),
                config.timeout_secs,
            )))
        }
        ProviderKind::Ollama => Ok(Arc::new(OllamaEmbedder::new(
            embedding_model,
            config.base_url.as_deref(),
            config.timeout_secs,
        ))),
    }
}

fn require_api_key(config: &ProviderConfig) -> anyhow::Result<String> {
    config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No API key for provider '{}': set provider.api_key or GEMINI_API_KEY",
                config.kind.as_str()
            )
        })
}

// ── Model handle ─────────────────────────────────────────────────

/// A provider bound to one model and temperature.
#[derive(Clone)]
pub struct LanguageModel {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f64,
}

impl LanguageModel {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &ProviderConfig) -> Self {
        Self::new(provider, config.model.clone(), config.temperature)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Free-text generation.
    pub async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.provider
            .chat_with_system(None, prompt, &self.model, self.temperature)
            .await
    }

    /// Ask for a JSON object and parse it into `T`.
    ///
    /// Fails when the backend errors or the reply does not match the schema.
    pub async fn assess<T: DeserializeOwned>(&self, prompt: &str) -> anyhow::Result<T> {
        let raw = self
            .provider
            .chat_json(None, prompt, &self.model, self.temperature)
            .await?;
        parse_json_reply(&raw)
    }
}

/// Extract and parse the JSON object in a model reply.
///
/// Models often wrap JSON in a fenced block or surround it with prose; the
/// first `{` through the last `}` is taken as the payload.
pub fn parse_json_reply<T: DeserializeOwned>(raw: &str) -> anyhow::Result<T> {
    let candidate = extract_json_object(raw)
        .ok_or_else(|| anyhow::anyhow!("No JSON object in model reply: {}", preview(raw)))?;
    serde_json::from_str(candidate)
        .with_context(|| format!("Model reply does not match schema: {}", preview(candidate)))
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn preview(text: &str) -> String {
    const MAX: usize = 200;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Verdict {
        is_valid: bool,
        reason: String,
    }

    #[test]
    fn parses_bare_json() {
        let v: Verdict = parse_json_reply(r#"{"is_valid": true, "reason": "ok"}"#).unwrap();
        assert!(v.is_valid);
    }

    #[test]
    fn parses_fenced_json_with_prose() {
        let raw = "Here you go:\n```json\n{\n  \"is_valid\": false,\n  \"reason\": \"No citation\"\n}\n```\nThanks";
        let v: Verdict = parse_json_reply(raw).unwrap();
        assert_eq!(
            v,
            Verdict {
                is_valid: false,
                reason: "No citation".into()
            }
        );
    }

    #[test]
    fn missing_json_is_an_error() {
        let err = parse_json_reply::<Verdict>("I cannot answer that.").unwrap_err();
        assert!(err.to_string().contains("No JSON object"));
    }

    #[test]
    fn schema_mismatch_is_an_error() {
        let err = parse_json_reply::<Verdict>(r#"{"valid": "yes"}"#).unwrap_err();
        assert!(err.to_string().contains("does not match schema"));
    }

    #[test]
    fn gemini_without_key_is_rejected() {
        let config = ProviderConfig::default();
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("No API key"));
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = ProviderConfig {
            kind: ProviderKind::Ollama,
            ..ProviderConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
        let embedder = create_embedder(&config, None).unwrap();
        assert_eq!(embedder.model_name(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn assess_goes_through_json_mode() {
        let provider = testing::ScriptedProvider::new([r#"{"is_valid": true, "reason": ""}"#]);
        let model = testing::model(&provider);
        let v: Verdict = model.assess("judge this").await.unwrap();
        assert!(v.is_valid);
        assert_eq!(provider.prompts(), vec!["judge this".to_string()]);
    }
}
