//! Summaries of recent developments from a configured legal news page.

use async_trait::async_trait;
use std::sync::Arc;

use super::traits::Responder;
use crate::providers::LanguageModel;
use crate::tools::{WebFetcher, FETCH_FAILURE_PREFIX};
use crate::workflow::state::ResponderKind;

pub struct WebResponder {
    model: LanguageModel,
    fetcher: Arc<dyn WebFetcher>,
    source_url: String,
}

impl WebResponder {
    pub fn new(model: LanguageModel, fetcher: Arc<dyn WebFetcher>, source_url: String) -> Self {
        Self {
            model,
            fetcher,
            source_url,
        }
    }

    fn build_prompt(query: &str, content: &str) -> String {
        format!(
            r#"You are a highly knowledgeable and reliable legal analyst AI.

Summarize the most recent legal developments relevant to the user's query, based solely on the provided web content.
Ensure the developments are current by checking for explicit dates in the content; if no dates are available or the content is outdated,
state: "No recent legal developments found in the provided content as of current month". Only include information explicitly stated in the web content;
do not speculate, infer, or add external knowledge. If the content is not relevant to the query or lacks legal developments,
state: "The provided content does not address the query or contain relevant legal developments."
Verify the credibility of the source (e.g., government sites, reputable legal publications) and note if the source appears unreliable.
If the query specifies a jurisdiction, focus on developments in that jurisdiction; otherwise, ask the user to clarify the jurisdiction.
Provide a clear, concise, and professional response tailored for a legal audience, including citations or references to the source where applicable.

Web Content:
{content}

User Query:
{query}"#
        )
    }
}

#[async_trait]
impl Responder for WebResponder {
    fn kind(&self) -> ResponderKind {
        ResponderKind::Web
    }

    async fn respond(&self, query: &str) -> anyhow::Result<String> {
        let content = self.fetcher.fetch(&self.source_url).await;
        let degraded = content.starts_with(FETCH_FAILURE_PREFIX);
        tracing::info!(
            responder = %self.kind(),
            url = %self.source_url,
            content_chars = content.chars().count(),
            degraded,
            "Fetched web content"
        );
        self.model.generate(&Self::build_prompt(query, &content)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::{model, ScriptedProvider};
    use crate::tools::HttpWebFetcher;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn summarizes_fetched_paragraphs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/top-stories"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><nav>Menu</nav><p>12 Oct: Supreme Court rules on data privacy.</p></html>",
            ))
            .mount(&server)
            .await;

        let provider = ScriptedProvider::new(["On 12 Oct the Supreme Court ruled on data privacy."]);
        let responder = WebResponder::new(
            model(&provider),
            Arc::new(HttpWebFetcher::new(5, 3000)),
            format!("{}/top-stories", server.uri()),
        );

        let draft = responder.respond("Latest privacy rulings in India?").await.unwrap();
        assert!(draft.contains("Supreme Court"));

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("12 Oct: Supreme Court rules on data privacy."));
        assert!(!prompt.contains("Menu"));
        assert!(prompt.contains("Latest privacy rulings in India?"));
    }

    #[tokio::test]
    async fn fetch_failure_degrades_to_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = ScriptedProvider::new([
            "The provided content does not address the query or contain relevant legal developments.",
        ]);
        let responder = WebResponder::new(
            model(&provider),
            Arc::new(HttpWebFetcher::new(5, 3000)),
            format!("{}/top-stories", server.uri()),
        );

        let draft = responder.respond("Recent rulings?").await.unwrap();
        assert!(draft.contains("does not address the query"));
        assert!(provider.prompts()[0].contains(FETCH_FAILURE_PREFIX));
    }
}
