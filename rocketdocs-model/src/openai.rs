//! An OpenAI-compatible [`LlmProvider`] built directly on `reqwest`
//! (covers OpenAI itself as well as Ollama/vLLM-style compatible
//! endpoints, matching the teacher's `compatible()` constructor).

use async_trait::async_trait;
use rocketdocs_core::document::Usage;
use rocketdocs_core::error::CoreError;
use rocketdocs_core::model::{FinishReason, LlmProvider, TextRequest, TextResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

pub struct OpenAiCompatibleProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model_prefix: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(api_key: impl Into<String>, model_prefix: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1", model_prefix)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model_prefix: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model_prefix: model_prefix.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingEntry {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

fn to_upstream(message: impl Into<String>) -> CoreError {
    CoreError::UpstreamIo { source: "openai".to_string(), message: message.into() }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn handles(&self, model: &str) -> bool {
        model.starts_with(&self.model_prefix)
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate_text(&self, request: TextRequest) -> Result<TextResponse, CoreError> {
        let body = ChatRequest {
            model: request.model,
            messages: vec![
                ChatMessage { role: "system", content: request.system },
                ChatMessage { role: "user", content: request.user },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| to_upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(to_upstream(format!("status {status}: {text}")));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| to_upstream(e.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| to_upstream("no choices in chat completion response"))?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("length") => FinishReason::Length,
            Some("stop") | None => FinishReason::Stop,
            Some(other) => FinishReason::Other(other.to_string()),
        };

        Ok(TextResponse {
            text: choice.message.content,
            usage: Usage {
                prompt_tokens: parsed.usage.prompt_tokens,
                completion_tokens: parsed.usage.completion_tokens,
            },
            finish_reason,
        })
    }

    async fn generate_embedding(
        &self,
        model: &str,
        inputs: &[String],
    ) -> Result<Vec<Vec<f32>>, CoreError> {
        let body = EmbeddingRequest { model, input: inputs };
        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| to_upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(to_upstream(format!("status {status}: {text}")));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| to_upstream(e.to_string()))?;
        Ok(parsed.data.into_iter().map(|e| e.embedding).collect())
    }
}
