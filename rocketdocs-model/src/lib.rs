//! The LLM Gateway (C1): a uniform text/json/embedding interface over
//! heterogeneous providers, with retry and token-budget-aware structured
//! output emulation.
//!
//! Provider selection is a lookup keyed by the requested model name (see
//! [`Gateway::provider_for`]); each provider in [`providers`] is an
//! independent [`rocketdocs_core::LlmProvider`] with no shared base state.

pub mod gateway;
pub mod gemini;
pub mod mock;
pub mod openai;

pub use gateway::{Gateway, JsonResponse};
pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use openai::OpenAiCompatibleProvider;
