//! An in-process mock provider so the rest of the system is testable
//! without network access (`§4.1`).

use async_trait::async_trait;
use rocketdocs_core::document::Usage;
use rocketdocs_core::error::CoreError;
use rocketdocs_core::model::{FinishReason, LlmProvider, TextRequest, TextResponse};
use tokio::sync::Mutex;

/// A canned text response, optionally triggering a simulated failure.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Text(String),
    Truncated,
    UpstreamError(String),
}

/// Deterministic, scriptable provider for tests: each call to
/// `generate_text` pops the next response off a queue (or falls back to a
/// default echo if the queue is empty), so scheduler/generator tests can
/// assert on exact call ordering and inject failures.
pub struct MockProvider {
    model_prefix: String,
    queue: Mutex<Vec<MockResponse>>,
    embedding_dims: usize,
}

impl MockProvider {
    pub fn new(model_prefix: impl Into<String>) -> Self {
        Self { model_prefix: model_prefix.into(), queue: Mutex::new(Vec::new()), embedding_dims: 8 }
    }

    pub fn with_embedding_dims(mut self, dims: usize) -> Self {
        self.embedding_dims = dims;
        self
    }

    /// Queue responses to be returned in order by successive `generate_text`
    /// calls.
    pub async fn push(&self, response: MockResponse) {
        self.queue.lock().await.push(response);
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn handles(&self, model: &str) -> bool {
        model.starts_with(&self.model_prefix)
    }

    async fn generate_text(&self, request: TextRequest) -> Result<TextResponse, CoreError> {
        let mut queue = self.queue.lock().await;
        let response = if queue.is_empty() {
            MockResponse::Text(format!(
                "# {}\n\n```json\n{{\"description\": \"mock description\"}}\n```",
                request.user.chars().take(40).collect::<String>()
            ))
        } else {
            queue.remove(0)
        };
        drop(queue);

        let usage = Usage {
            prompt_tokens: request.user.len() as u32 / 4,
            completion_tokens: 16,
        };
        match response {
            MockResponse::Text(text) => {
                Ok(TextResponse { text, usage, finish_reason: FinishReason::Stop })
            }
            MockResponse::Truncated => {
                Ok(TextResponse { text: String::new(), usage, finish_reason: FinishReason::Length })
            }
            MockResponse::UpstreamError(message) => {
                Err(CoreError::UpstreamIo { source: "mock".to_string(), message })
            }
        }
    }

    async fn generate_embedding(
        &self,
        _model: &str,
        inputs: &[String],
    ) -> Result<Vec<Vec<f32>>, CoreError> {
        Ok(inputs
            .iter()
            .map(|text| {
                let mut vector = vec![0f32; self.embedding_dims];
                for (i, byte) in text.bytes().enumerate() {
                    vector[i % self.embedding_dims] += byte as f32 / 255.0;
                }
                vector
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_response_embeds_a_heading() {
        let provider = MockProvider::new("mock");
        let response = provider
            .generate_text(TextRequest {
                model: "mock-1".to_string(),
                system: String::new(),
                user: "document this".to_string(),
                temperature: 0.0,
                max_tokens: 100,
            })
            .await
            .unwrap();
        assert!(response.text.starts_with('#'));
    }

    #[tokio::test]
    async fn queued_responses_are_returned_in_order() {
        let provider = MockProvider::new("mock");
        provider.push(MockResponse::Text("first".to_string())).await;
        provider.push(MockResponse::Text("second".to_string())).await;

        let req = |u: &str| TextRequest {
            model: "mock-1".to_string(),
            system: String::new(),
            user: u.to_string(),
            temperature: 0.0,
            max_tokens: 10,
        };
        let first = provider.generate_text(req("a")).await.unwrap();
        let second = provider.generate_text(req("b")).await.unwrap();
        assert_eq!(first.text, "first");
        assert_eq!(second.text, "second");
    }
}
