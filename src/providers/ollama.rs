//! Local Ollama backend (native `/api/chat` and `/api/embed`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::traits::{Embedder, Provider};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default local embedding model.
pub const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Ollama chat request (native API format, not OpenAI-compatible).
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

fn normalize_base_url(base_url: Option<&str>) -> String {
    // Accept the OpenAI-compatible `/v1` root as well.
    base_url
        .unwrap_or(DEFAULT_OLLAMA_URL)
        .trim_end_matches('/')
        .trim_end_matches("/v1")
        .to_string()
}

fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: Option<&str>, timeout_secs: u64) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            client: build_client(timeout_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn chat(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
        format: Option<&'static str>,
    ) -> anyhow::Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(OllamaMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(OllamaMessage {
            role: "user",
            content: message,
        });

        let body = OllamaChatRequest {
            model,
            messages,
            stream: false,
            format,
            options: OllamaOptions { temperature },
        };

        let url = format!("{}/api/chat", self.base_url);
        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("Ollama returned status {}", resp.status());
        }

        let chat_resp: OllamaChatResponse = resp.json().await?;
        let content = chat_resp.message.content.trim().to_string();
        if content.is_empty() {
            anyhow::bail!("Ollama returned empty response");
        }
        Ok(content)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        self.chat(system_prompt, message, model, temperature, None)
            .await
    }

    async fn chat_json(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        self.chat(system_prompt, message, model, temperature, Some("json"))
            .await
    }
}

pub struct OllamaEmbedder {
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(model: Option<&str>, base_url: Option<&str>, timeout_secs: u64) -> Self {
        Self {
            model: model.unwrap_or(DEFAULT_OLLAMA_EMBEDDING_MODEL).to_string(),
            base_url: normalize_base_url(base_url),
            client: build_client(timeout_secs),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let url = format!("{}/api/embed", self.base_url);
        let body = OllamaEmbedRequest {
            model: &self.model,
            input: text,
        };
        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("Ollama embed returned status {}", resp.status());
        }
        let parsed: OllamaEmbedResponse = resp.json().await?;
        parsed
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Ollama returned no embedding"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn base_url_strips_v1_suffix() {
        let provider = OllamaProvider::new(Some("http://10.0.0.1:11434/v1/"), 5);
        assert_eq!(provider.base_url(), "http://10.0.0.1:11434");
        let default = OllamaProvider::new(None, 5);
        assert_eq!(default.base_url(), DEFAULT_OLLAMA_URL);
    }

    #[tokio::test]
    async fn chat_json_requests_json_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "qwen3:0.6b",
                "stream": false,
                "format": "json"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": { "role": "assistant", "content": "  {\"query_type\": \"rag\"}  " }
            })))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(Some(&server.uri()), 5);
        let reply = provider
            .chat_json(Some("classify"), "Section 230", "qwen3:0.6b", 0.1)
            .await
            .unwrap();
        assert_eq!(reply, "{\"query_type\": \"rag\"}");
    }

    #[tokio::test]
    async fn empty_chat_reply_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": { "content": "   " }
            })))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(Some(&server.uri()), 5);
        let err = provider
            .chat_with_system(None, "hi", "qwen3:0.6b", 0.1)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn embed_returns_first_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2], [9.0, 9.0]]
            })))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(None, Some(&server.uri()), 5);
        assert_eq!(embedder.model_name(), DEFAULT_OLLAMA_EMBEDDING_MODEL);
        assert_eq!(embedder.embed("bail").await.unwrap(), vec![0.1, 0.2]);
    }
}
