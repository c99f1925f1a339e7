//! A minimal async client for the Gemini `generateContent` and
//! `embedContent` REST endpoints.
//!
//! This is intentionally narrow: it covers exactly what
//! `rocketdocs-model`'s Gemini provider needs and nothing of the batch,
//! cache, file-upload, or streaming surface a full client would expose.

mod client;
mod model;

pub use client::{Error, GeminiClient};
pub use model::{
    Candidate, Content, EmbedContentRequest, EmbedContentResponse, FinishReason,
    GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part, UsageMetadata,
};
