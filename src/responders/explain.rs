//! General legal explanations from model knowledge alone.

use async_trait::async_trait;

use super::traits::Responder;
use crate::providers::LanguageModel;
use crate::workflow::state::ResponderKind;

pub struct ExplainResponder {
    model: LanguageModel,
}

impl ExplainResponder {
    pub fn new(model: LanguageModel) -> Self {
        Self { model }
    }

    fn build_prompt(query: &str) -> String {
        format!(
            r#"You are a highly knowledgeable and reliable legal assistant with expertise in current laws and regulations.

Provide a clear, concise, and legally accurate response to the following question. Base your answer solely on
established legal principles, statutes, case law, or official regulations relevant to the jurisdiction specified (if any).
If the question lacks a specified jurisdiction, ask for clarification or assume a general, widely applicable legal framework.
Avoid speculation, opinions, or unverified information.
If the answer is uncertain or requires specialized legal advice, state that clearly and recommend consulting a licensed attorney.
Keep the response brief, professional, and directly relevant to the question.

Question: {query}"#
        )
    }
}

#[async_trait]
impl Responder for ExplainResponder {
    fn kind(&self) -> ResponderKind {
        ResponderKind::Explain
    }

    async fn respond(&self, query: &str) -> anyhow::Result<String> {
        tracing::info!(responder = %self.kind(), "Generating explanation");
        self.model.generate(&Self::build_prompt(query)).await
    }
}
