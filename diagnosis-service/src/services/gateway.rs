//! Inference gateway: turns diagnosis requests into provider calls.
//!
//! No retries, no backoff. A failed upstream call is returned to the caller
//! as-is; an upstream reply without text becomes a fixed placeholder.

use super::prompts::{PromptTemplate, FOLLOWUP_PROMPT, REPORT_PROMPT};
use super::providers::{Completion, InferenceProvider, PromptPart, ProviderError};
use crate::models::ImageUpload;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

/// Returned as the report when the upstream reply carries no text.
pub const REPORT_FALLBACK: &str = "No report generated";

/// Returned as the answer when the upstream reply carries no text.
pub const FOLLOWUP_FALLBACK: &str = "No answer";

#[derive(Clone)]
pub struct InferenceGateway {
    report_provider: Arc<dyn InferenceProvider>,
    followup_provider: Arc<dyn InferenceProvider>,
}

impl InferenceGateway {
    pub fn new(
        report_provider: Arc<dyn InferenceProvider>,
        followup_provider: Arc<dyn InferenceProvider>,
    ) -> Self {
        Self {
            report_provider,
            followup_provider,
        }
    }

    /// Ask the vision model for a structured report on `image`.
    pub async fn generate_report(&self, image: &ImageUpload) -> Result<String, ProviderError> {
        let parts = vec![
            PromptPart::Text(REPORT_PROMPT.render(&[])),
            PromptPart::InlineImage {
                mime_type: image.mime_type.clone(),
                data: image.base64.clone(),
            },
        ];

        self.call(
            "report",
            &REPORT_PROMPT,
            self.report_provider.as_ref(),
            parts,
            REPORT_FALLBACK,
        )
        .await
    }

    /// Ask the text model a question about a previously generated report.
    pub async fn answer_followup(
        &self,
        report: &str,
        question: &str,
    ) -> Result<String, ProviderError> {
        let prompt = FOLLOWUP_PROMPT.render(&[("report", report), ("question", question)]);

        self.call(
            "followup",
            &FOLLOWUP_PROMPT,
            self.followup_provider.as_ref(),
            vec![PromptPart::Text(prompt)],
            FOLLOWUP_FALLBACK,
        )
        .await
    }

    async fn call(
        &self,
        operation: &'static str,
        template: &PromptTemplate,
        provider: &dyn InferenceProvider,
        parts: Vec<PromptPart>,
        fallback: &str,
    ) -> Result<String, ProviderError> {
        let model = provider.model().to_string();
        let prompt = template.label();
        let start = Instant::now();

        let result = provider.generate(parts).await;

        histogram!(
            "diagnosis_upstream_duration_seconds",
            "operation" => operation,
            "model" => model.clone()
        )
        .record(start.elapsed().as_secs_f64());

        let outcome = match &result {
            Ok(Completion::Text(_)) => "text",
            Ok(Completion::Empty { .. }) => "empty",
            Err(_) => "error",
        };
        counter!(
            "diagnosis_upstream_requests_total",
            "operation" => operation,
            "model" => model.clone(),
            "outcome" => outcome
        )
        .increment(1);

        match result {
            Ok(Completion::Text(text)) => {
                tracing::info!(
                    operation,
                    model = %model,
                    prompt = %prompt,
                    output_len = text.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Upstream generation completed"
                );
                Ok(text)
            }
            Ok(Completion::Empty { finish_reason }) => {
                tracing::warn!(
                    operation,
                    model = %model,
                    prompt = %prompt,
                    finish_reason = finish_reason.as_deref().unwrap_or("unknown"),
                    "Upstream reply had no text, returning placeholder"
                );
                Ok(fallback.to_string())
            }
            Err(e) => {
                tracing::error!(
                    operation,
                    model = %model,
                    prompt = %prompt,
                    error = %e,
                    "Upstream generation failed"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::MockProvider;

    fn gateway(
        report: MockProvider,
        followup: MockProvider,
    ) -> (InferenceGateway, Arc<MockProvider>, Arc<MockProvider>) {
        let report = Arc::new(report);
        let followup = Arc::new(followup);
        (
            InferenceGateway::new(report.clone(), followup.clone()),
            report,
            followup,
        )
    }

    #[tokio::test]
    async fn report_sends_instruction_then_image() {
        let (gateway, report, followup) = gateway(
            MockProvider::new("vision").with_text("Findings: clear lungs"),
            MockProvider::new("text"),
        );
        let image = ImageUpload::from_bytes(b"jpeg-bytes", Some("image/jpeg"));

        let text = gateway.generate_report(&image).await.unwrap();
        assert_eq!(text, "Findings: clear lungs");

        let calls = report.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], PromptPart::Text(REPORT_PROMPT.text.to_string()));
        assert_eq!(
            calls[0][1],
            PromptPart::InlineImage {
                mime_type: "image/jpeg".to_string(),
                data: image.base64.clone(),
            }
        );
        assert!(followup.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_report_becomes_placeholder() {
        let (gateway, _, _) = gateway(
            MockProvider::new("vision").with_empty(),
            MockProvider::new("text"),
        );
        let image = ImageUpload::from_bytes(b"x", None);

        assert_eq!(gateway.generate_report(&image).await.unwrap(), REPORT_FALLBACK);
    }

    #[tokio::test]
    async fn followup_uses_text_model_with_rendered_prompt() {
        let (gateway, report, followup) = gateway(
            MockProvider::new("vision"),
            MockProvider::new("text").with_text("No fracture is described."),
        );

        let answer = gateway
            .answer_followup("Lungs are clear.", "Is there a fracture?")
            .await
            .unwrap();
        assert_eq!(answer, "No fracture is described.");

        assert!(report.calls().is_empty());
        assert_eq!(
            followup.calls(),
            vec![vec![PromptPart::Text(
                "Given this radiology report:\nLungs are clear.\n\nAnswer this follow-up question: Is there a fracture?"
                    .to_string()
            )]]
        );
    }

    #[tokio::test]
    async fn empty_answer_becomes_placeholder() {
        let (gateway, _, _) = gateway(
            MockProvider::new("vision"),
            MockProvider::new("text").with_empty(),
        );

        assert_eq!(gateway.answer_followup("r", "q").await.unwrap(), FOLLOWUP_FALLBACK);
    }

    #[tokio::test]
    async fn provider_errors_are_not_retried() {
        let (gateway, _, followup) = gateway(
            MockProvider::new("vision"),
            MockProvider::new("text")
                .with_error(ProviderError::NetworkError("connection refused".to_string()))
                .with_text("should not be used"),
        );

        let err = gateway.answer_followup("r", "q").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(followup.calls().len(), 1);
    }

    #[tokio::test]
    async fn repeated_followups_each_reach_the_provider() {
        let (gateway, _, followup) = gateway(
            MockProvider::new("vision"),
            MockProvider::new("text").with_text("first").with_text("second"),
        );

        assert_eq!(gateway.answer_followup("r", "q").await.unwrap(), "first");
        assert_eq!(gateway.answer_followup("r", "q").await.unwrap(), "second");
        assert_eq!(followup.calls().len(), 2);
    }
}
