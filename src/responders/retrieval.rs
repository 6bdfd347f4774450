//! Answers grounded in passages from the local document index.

use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;

use super::traits::Responder;
use crate::providers::LanguageModel;
use crate::retrieval::DocumentIndex;
use crate::workflow::state::ResponderKind;

pub struct RetrievalResponder {
    model: LanguageModel,
    index: Arc<dyn DocumentIndex>,
    top_k: usize,
}

impl RetrievalResponder {
    pub fn new(model: LanguageModel, index: Arc<dyn DocumentIndex>, top_k: usize) -> Self {
        Self {
            model,
            index,
            top_k,
        }
    }

    fn build_prompt(query: &str, context: &str) -> String {
        format!(
            r#"You are a highly knowledgeable and reliable legal assistant.

Provide a clear, concise, and legally accurate response to the user's question based solely on the provided context.
Do not speculate, add external information, or rely on prior knowledge beyond the context.
If the answer is not explicitly present in the provided documents, respond with: "Not found in the provided documents."
Keep the response professional and directly relevant to the question.

Context:
{context}

Question:
{query}"#
        )
    }
}

#[async_trait]
impl Responder for RetrievalResponder {
    fn kind(&self) -> ResponderKind {
        ResponderKind::Retrieve
    }

    async fn respond(&self, query: &str) -> anyhow::Result<String> {
        let passages = self
            .index
            .search(query, self.top_k)
            .await
            .context("Document retrieval failed")?;
        tracing::info!(
            responder = %self.kind(),
            passages = passages.len(),
            "Retrieved context passages"
        );

        let context = passages.join("\n\n");
        self.model.generate(&Self::build_prompt(query, &context)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::{model, ScriptedProvider};
    use crate::retrieval::index::testing::StaticIndex;
    use std::collections::HashMap;

    #[tokio::test]
    async fn passages_become_prompt_context() {
        let query = "What does Section 230 say?";
        let index = StaticIndex {
            passages: HashMap::from([(
                query.to_string(),
                vec![
                    "Section 230 shields platforms.".to_string(),
                    "It was enacted in 1996.".to_string(),
                    "Third passage.".to_string(),
                ],
            )]),
            unavailable: false,
        };
        let provider = ScriptedProvider::new(["Section 230 shields platforms from liability."]);
        let responder = RetrievalResponder::new(model(&provider), Arc::new(index), 2);

        let draft = responder.respond(query).await.unwrap();
        assert_eq!(draft, "Section 230 shields platforms from liability.");

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("Section 230 shields platforms.\n\nIt was enacted in 1996."));
        assert!(!prompt.contains("Third passage."));
    }

    #[tokio::test]
    async fn unavailable_index_is_fatal() {
        let index = StaticIndex {
            unavailable: true,
            ..StaticIndex::default()
        };
        let provider = ScriptedProvider::new(["unused"]);
        let responder = RetrievalResponder::new(model(&provider), Arc::new(index), 4);

        let err = responder.respond("Article 21").await.unwrap_err();
        assert!(format!("{err:#}").contains("unavailable"));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn no_hits_still_generates() {
        let provider = ScriptedProvider::new(["Not found in the provided documents."]);
        let responder =
            RetrievalResponder::new(model(&provider), Arc::new(StaticIndex::default()), 4);
        let draft = responder.respond("Unknown act").await.unwrap();
        assert_eq!(draft, "Not found in the provided documents.");
    }
}
