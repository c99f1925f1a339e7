//! Request/response wire types for the slice of the Gemini API we use.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: "user".to_string(), parts: vec![Part { text: text.into() }] }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Gemini's `finishReason`, as either the current string form or the
/// legacy numeric enum some API versions still emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "FinishReasonWire")]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FinishReasonWire {
    Str(String),
    Num(i64),
}

impl TryFrom<FinishReasonWire> for FinishReason {
    type Error = std::convert::Infallible;

    fn try_from(wire: FinishReasonWire) -> Result<Self, Self::Error> {
        Ok(match wire {
            FinishReasonWire::Str(s) => match s.as_str() {
                "STOP" => FinishReason::Stop,
                "MAX_TOKENS" => FinishReason::MaxTokens,
                _ => FinishReason::Other,
            },
            FinishReasonWire::Num(1) => FinishReason::Stop,
            FinishReasonWire::Num(2) => FinishReason::MaxTokens,
            FinishReasonWire::Num(_) => FinishReason::Other,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Concatenate every text part of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect::<String>())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedContentRequest {
    pub requests: Vec<SingleEmbedRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SingleEmbedRequest {
    pub model: String,
    pub content: Content,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentEmbedding {
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedContentResponse {
    #[serde(default)]
    pub embeddings: Vec<ContentEmbedding>,
}
