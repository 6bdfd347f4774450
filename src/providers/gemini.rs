//! Google Gemini REST client (`generateContent` and `embedContent`).

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::traits::{Embedder, Provider};

/// Public Gemini API root.
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default embedding model.
pub const DEFAULT_GEMINI_EMBEDDING_MODEL: &str = "models/embedding-001";

fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Model identifiers are accepted with or without the `models/` prefix.
fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

// ── Text generation ──────────────────────────────────────────────

pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, base_url: Option<&str>, timeout_secs: u64) -> Self {
        Self {
            api_key,
            base_url: base_url
                .unwrap_or(DEFAULT_GEMINI_URL)
                .trim_end_matches('/')
                .to_string(),
            client: build_client(timeout_secs),
        }
    }

    async fn generate(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
        json_mode: bool,
    ) -> anyhow::Result<String> {
        let mut generation_config = serde_json::json!({ "temperature": temperature });
        if json_mode {
            generation_config["responseMimeType"] = "application/json".into();
        }

        let mut payload = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": message }]
            }],
            "generationConfig": generation_config,
        });
        if let Some(system) = system_prompt {
            payload["systemInstruction"] = serde_json::json!({ "parts": [{ "text": system }] });
        }

        let url = format!("{}/{}:generateContent", self.base_url, model_path(model));
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error {status}: {body}");
        }

        let body: serde_json::Value = resp.json().await?;
        let text = body["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = body["candidates"][0]["finishReason"]
                .as_str()
                .or_else(|| body["promptFeedback"]["blockReason"].as_str())
                .unwrap_or("no candidates");
            anyhow::bail!("Gemini returned an empty response ({reason})");
        }
        Ok(text)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        self.generate(system_prompt, message, model, temperature, false)
            .await
    }

    async fn chat_json(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        self.generate(system_prompt, message, model, temperature, true)
            .await
    }
}

// ── Embeddings ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

pub struct GeminiEmbedder {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiEmbedder {
    pub fn new(
        api_key: String,
        model: Option<&str>,
        base_url: Option<&str>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            api_key,
            model: model_path(model.unwrap_or(DEFAULT_GEMINI_EMBEDDING_MODEL)),
            base_url: base_url
                .unwrap_or(DEFAULT_GEMINI_URL)
                .trim_end_matches('/')
                .to_string(),
            client: build_client(timeout_secs),
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let payload = serde_json::json!({
            "model": self.model,
            "content": { "parts": [{ "text": text }] },
        });
        let url = format!("{}/{}:embedContent", self.base_url, self.model);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gemini embedding error {status}: {body}");
        }

        let parsed: EmbedContentResponse = resp.json().await?;
        if parsed.embedding.values.is_empty() {
            anyhow::bail!("Gemini returned an empty embedding");
        }
        Ok(parsed.embedding.values)
    }
}
