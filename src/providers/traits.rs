use async_trait::async_trait;

/// A text-generation backend.
///
/// Implementations are stateless from the caller's point of view and are
/// shared across concurrent workflows behind an `Arc`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short backend identifier used in logs.
    fn name(&self) -> &str;

    /// Send one user message (with an optional system prompt) and return the
    /// model's text reply.
    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String>;

    /// Like [`Provider::chat_with_system`] but asks the backend to emit JSON
    /// when it supports a dedicated mode for it.
    async fn chat_json(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        self.chat_with_system(system_prompt, message, model, temperature)
            .await
    }
}

/// Turns a piece of text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}
