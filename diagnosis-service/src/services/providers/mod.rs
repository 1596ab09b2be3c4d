//! Generative AI provider abstractions and implementations.
//!
//! The gateway talks to a provider through [`InferenceProvider`], so the
//! Gemini client can be swapped for the mock in tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate limited by upstream")]
    RateLimited,

    #[error("API error {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// One piece of a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    /// Inline image, already base64 encoded.
    InlineImage { mime_type: String, data: String },
}

/// Outcome of a successful upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Text found at the first candidate's first part.
    Text(String),
    /// The call succeeded but the response carried no text at that path.
    Empty { finish_reason: Option<String> },
}

/// Trait for single-shot content generation (e.g., Gemini `generateContent`).
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Model identifier, for logs and metrics.
    fn model(&self) -> &str;

    /// Send one user turn made of `parts` and return the first candidate.
    async fn generate(&self, parts: Vec<PromptPart>) -> Result<Completion, ProviderError>;
}
