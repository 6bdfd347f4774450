//! Quality check on a draft answer before it reaches the user.

use anyhow::Context;

use super::state::{Validation, WorkflowState};
use crate::providers::LanguageModel;

pub struct Validator {
    model: LanguageModel,
}

impl Validator {
    pub fn new(model: LanguageModel) -> Self {
        Self { model }
    }

    fn build_prompt(query: &str, draft: &str) -> String {
        format!(
            r#"You are a legal expert tasked with evaluating the quality of AI-generated legal responses. Your evaluation should be thorough and based on the following criteria.
Evaluate the following response to the given query:

Query:
{query}

Response:
{draft}

Evaluation Criteria:
1. Factual Accuracy: Are all claims in the response factually correct and supported by evidence or reliable knowledge?
2. Relevance to Query: Does the response directly address the query and stay on topic?
3. Completeness: Does the response fully answer the query, covering all necessary aspects without omitting key details?
4. Jurisdiction Appropriateness: Is the response appropriate for the relevant legal, cultural, or regional context of the query?
5. Source Citation: If sources are mentioned, are they credible, relevant, and properly cited with clear attribution?

Return your evaluation in the following JSON structure:
{{
    "is_valid": <true/false>,
    "reason": "<If is_valid is false, a clear, concise explanation of the issues based on the criteria. Otherwise 'No issues identified.'>"
}}"#
        )
    }

    /// Judge the current draft. Leaves `final_answer` untouched.
    pub async fn validate(&self, state: &WorkflowState) -> anyhow::Result<WorkflowState> {
        let draft = state
            .draft_answer
            .as_deref()
            .context("Validator invoked without a draft answer")?;

        let verdict: Validation = self
            .model
            .assess(&Self::build_prompt(state.query(), draft))
            .await?;
        tracing::info!(
            is_valid = verdict.is_valid,
            reason = %verdict.reason,
            retry_count = state.retry_count,
            "Validated draft answer"
        );
        Ok(state.with_validation(verdict))
    }
}
