//! Gemini-backed [`LlmProvider`], grounded on `rocketdocs-gemini`'s
//! `generateContent`/`batchEmbedContents` client.

use async_trait::async_trait;
use rocketdocs_core::document::Usage;
use rocketdocs_core::error::CoreError;
use rocketdocs_core::model::{FinishReason, LlmProvider, TextRequest, TextResponse};
use rocketdocs_gemini::{
    Content, EmbedContentRequest, GeminiClient, GenerateContentRequest, GenerationConfig,
    SingleEmbedRequest,
};
use tracing::instrument;

pub struct GeminiProvider {
    client: GeminiClient,
}

impl GeminiProvider {
    pub fn new(api_key: impl AsRef<str>) -> Result<Self, rocketdocs_gemini::Error> {
        Ok(Self { client: GeminiClient::new(api_key)? })
    }
}

fn to_upstream(err: rocketdocs_gemini::Error) -> CoreError {
    CoreError::UpstreamIo { source: "gemini".to_string(), message: err.to_string() }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn handles(&self, model: &str) -> bool {
        model.starts_with("gemini-")
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate_text(&self, request: TextRequest) -> Result<TextResponse, CoreError> {
        let gemini_request = GenerateContentRequest {
            contents: vec![Content::user(request.user)],
            system_instruction: Some(Content::user(request.system)),
            generation_config: Some(GenerationConfig {
                temperature: Some(request.temperature),
                max_output_tokens: Some(request.max_tokens),
                response_mime_type: None,
            }),
        };
        let response = self
            .client
            .generate_content(&request.model, &gemini_request)
            .await
            .map_err(to_upstream)?;

        let finish_reason = response
            .candidates
            .first()
            .and_then(|c| c.finish_reason)
            .map(|reason| match reason {
                rocketdocs_gemini::FinishReason::Stop => FinishReason::Stop,
                rocketdocs_gemini::FinishReason::MaxTokens => FinishReason::Length,
                rocketdocs_gemini::FinishReason::Other => FinishReason::Other("other".to_string()),
            })
            .unwrap_or(FinishReason::Stop);

        let usage = response
            .usage_metadata
            .as_ref()
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        // Gemini occasionally prefixes completions with a stray leading
        // space; normalize it out (§4.1's "provider-specific quirk").
        let text = response.text().strip_prefix(' ').map(str::to_string).unwrap_or_else(|| response.text());

        Ok(TextResponse { text, usage, finish_reason })
    }

    async fn generate_embedding(
        &self,
        model: &str,
        inputs: &[String],
    ) -> Result<Vec<Vec<f32>>, CoreError> {
        let request = EmbedContentRequest {
            requests: inputs
                .iter()
                .map(|text| SingleEmbedRequest { model: model.to_string(), content: Content::user(text) })
                .collect(),
        };
        let response = self.client.batch_embed_contents(model, &request).await.map_err(to_upstream)?;
        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}
