//! The provider-facing half of the LLM Gateway (C1).
//!
//! A [`LlmProvider`] is the minimal seam every backend (Gemini, an
//! OpenAI-compatible endpoint, a test mock) must implement. The gateway in
//! `rocketdocs-model` builds `generate_json` on top of `generate_text` by
//! emulating structured output: ask for JSON, parse, retry with the parse
//! error appended on failure.

use async_trait::async_trait;

use crate::document::Usage;
use crate::error::CoreError;

/// Why the provider stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    Other(String),
}

/// A single text-completion request.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The result of one completion call.
#[derive(Debug, Clone)]
pub struct TextResponse {
    pub text: String,
    pub usage: Usage,
    pub finish_reason: FinishReason,
}

/// A provider behind the LLM Gateway.
///
/// Implementations are independent and carry no shared base state; provider
/// selection is a lookup keyed by model name (see `rocketdocs-model::Gateway`).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name, used in error messages and tracing.
    fn name(&self) -> &str;

    /// Whether this provider's model name is handled by this instance.
    fn handles(&self, model: &str) -> bool;

    /// Generate a plain-text completion.
    async fn generate_text(&self, request: TextRequest) -> Result<TextResponse, CoreError>;

    /// Generate embeddings for up to 2048 inputs. Callers are responsible for
    /// splitting larger batches before calling.
    async fn generate_embedding(
        &self,
        model: &str,
        inputs: &[String],
    ) -> Result<Vec<Vec<f32>>, CoreError>;
}
