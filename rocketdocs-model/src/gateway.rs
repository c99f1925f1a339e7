//! The provider-agnostic half of the Gateway: `generate_text`,
//! `generate_json`, and `generate_embedding`, built on top of the
//! `rocketdocs_core::LlmProvider` seam.

use std::sync::Arc;

use rocketdocs_core::document::Usage;
use rocketdocs_core::error::CoreError;
use rocketdocs_core::model::{FinishReason, LlmProvider, TextRequest, TextResponse};
use tracing::{info, instrument, warn};

/// The result of a successful `generate_json` call.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    pub object: serde_json::Value,
    pub usage: Usage,
    pub finish_reason: FinishReason,
}

/// Routes requests to the provider whose [`LlmProvider::handles`] matches
/// the requested model name. Providers are tried in registration order;
/// the first match wins.
#[derive(Clone, Default)]
pub struct Gateway {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self { providers: Vec::new() }
    }

    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn provider_for(&self, model: &str) -> Result<&Arc<dyn LlmProvider>, CoreError> {
        self.providers
            .iter()
            .find(|p| p.handles(model))
            .ok_or_else(|| CoreError::UpstreamIo {
                source: "gateway".to_string(),
                message: format!("no provider registered for model '{model}'"),
            })
    }

    /// Plain-text completion. `§4.1`.
    #[instrument(skip(self, system, user), fields(model = %model))]
    pub async fn generate_text(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<TextResponse, CoreError> {
        let provider = self.provider_for(model)?;
        let request = TextRequest {
            model: model.to_string(),
            system: system.to_string(),
            user: user.to_string(),
            temperature,
            max_tokens,
        };
        provider.generate_text(request).await
    }

    /// Structured-JSON completion, emulated over `generate_text` when the
    /// provider has no native structured mode: ask for JSON, parse,
    /// validate against `schema`, and on failure retry up to
    /// `max_retries` with the parse/validation error appended to the user
    /// message. `§4.1`.
    #[instrument(skip(self, system, user, schema), fields(model = %model))]
    pub async fn generate_json(
        &self,
        model: &str,
        system: &str,
        user: &str,
        schema: &serde_json::Value,
        max_retries: u32,
        max_tokens: u32,
    ) -> Result<JsonResponse, CoreError> {
        let provider = self.provider_for(model)?;
        let json_system = format!(
            "{system}\n\nRespond with a single JSON object matching this schema and nothing else:\n{schema}"
        );
        let mut user_message = user.to_string();
        let mut usage = Usage::default();

        for attempt in 0..=max_retries {
            let request = TextRequest {
                model: model.to_string(),
                system: json_system.clone(),
                user: user_message.clone(),
                temperature: 0.0,
                max_tokens,
            };
            let response = provider.generate_text(request).await?;
            usage.add(response.usage);

            if response.finish_reason == FinishReason::Length {
                return Err(CoreError::LlmTruncated { model: model.to_string() });
            }

            match parse_and_validate(&response.text, schema) {
                Ok(object) => {
                    return Ok(JsonResponse { object, usage, finish_reason: response.finish_reason });
                }
                Err(parse_error) => {
                    warn!(attempt, %parse_error, "generate_json validation failed, retrying");
                    if attempt == max_retries {
                        return Err(CoreError::LlmParseError(parse_error));
                    }
                    user_message =
                        format!("{user}\n\nYour previous response failed validation: {parse_error}. Respond again with only the corrected JSON object.");
                }
            }
        }
        unreachable!("loop always returns by the final iteration")
    }

    /// Embeddings for up to 2048 inputs; larger batches are split here so
    /// callers never have to think about the provider limit. `§4.1`.
    #[instrument(skip(self, inputs), fields(model = %model, count = inputs.len()))]
    pub async fn generate_embedding(
        &self,
        model: &str,
        inputs: &[String],
    ) -> Result<Vec<Vec<f32>>, CoreError> {
        let provider = self.provider_for(model)?;
        const MAX_BATCH: usize = 2048;
        if inputs.len() <= MAX_BATCH {
            return provider.generate_embedding(model, inputs).await;
        }
        info!(count = inputs.len(), "splitting oversized embedding batch");
        let mut out = Vec::with_capacity(inputs.len());
        for chunk in inputs.chunks(MAX_BATCH) {
            out.extend(provider.generate_embedding(model, chunk).await?);
        }
        Ok(out)
    }
}

/// Parse `text` as JSON and check it against a minimal JSON-Schema subset:
/// `{"type":"object","required":[...],"properties":{name:{"type":...}}}`.
/// This is deliberately small — full schema validation is out of scope,
/// we only need enough to guarantee `extracted.description` exists.
fn parse_and_validate(text: &str, schema: &serde_json::Value) -> Result<serde_json::Value, String> {
    let trimmed = extract_json_object(text).ok_or_else(|| "no JSON object found in response".to_string())?;
    let object: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| format!("invalid json: {e}"))?;

    if !object.is_object() {
        return Err("top-level JSON value is not an object".to_string());
    }

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for field in required {
            let Some(field_name) = field.as_str() else { continue };
            let Some(value) = object.get(field_name) else {
                return Err(format!("missing required field '{field_name}'"));
            };
            if let Some(expected_type) =
                schema.get("properties").and_then(|p| p.get(field_name)).and_then(|p| p.get("type"))
            {
                if let Some(expected_type) = expected_type.as_str() {
                    if !matches_json_type(value, expected_type) {
                        return Err(format!("field '{field_name}' is not of type {expected_type}"));
                    }
                }
            }
        }
    }

    Ok(object)
}

fn matches_json_type(value: &serde_json::Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

/// Providers occasionally wrap JSON in a fenced code block or surround it
/// with prose; find the outermost `{...}` span rather than assuming the
/// whole response is valid JSON.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// A convenience schema for the `{description: string}` shape used
/// throughout the Doc Generator.
pub fn description_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "required": ["description"],
        "properties": { "description": { "type": "string" } }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_json() {
        let text = "Sure, here you go:\n```json\n{\"description\": \"hi\"}\n```\nThanks!";
        let extracted = extract_json_object(text).unwrap();
        let value: serde_json::Value = serde_json::from_str(extracted).unwrap();
        assert_eq!(value["description"], "hi");
    }

    #[test]
    fn validate_rejects_missing_field() {
        let schema = description_schema();
        let err = parse_and_validate("{}", &schema).unwrap_err();
        assert!(err.contains("description"));
    }

    #[test]
    fn validate_accepts_matching_object() {
        let schema = description_schema();
        let value = parse_and_validate("{\"description\": \"hi\"}", &schema).unwrap();
        assert_eq!(value["description"], "hi");
    }
}
