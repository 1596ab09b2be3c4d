//! Mock provider implementation for testing.

use super::{Completion, InferenceProvider, PromptPart, ProviderError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays scripted outcomes in order and records every prompt it receives.
/// Once the script runs out, every call returns an empty completion.
pub struct MockProvider {
    model: String,
    script: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    calls: Mutex<Vec<Vec<PromptPart>>>,
}

impl MockProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text reply.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.push(Ok(Completion::Text(text.into())))
    }

    /// Queue a reply with no text at the expected path.
    pub fn with_empty(self) -> Self {
        self.push(Ok(Completion::Empty {
            finish_reason: None,
        }))
    }

    /// Queue a failure.
    pub fn with_error(self, error: ProviderError) -> Self {
        self.push(Err(error))
    }

    fn push(self, outcome: Result<Completion, ProviderError>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
        self
    }

    /// Prompts received so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<PromptPart>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl InferenceProvider for MockProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, parts: Vec<PromptPart>) -> Result<Completion, ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(parts);

        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(Ok(Completion::Empty {
                finish_reason: None,
            }))
    }
}
