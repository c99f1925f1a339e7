use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::model::{EmbedContentRequest, EmbedContentResponse, GenerateContentRequest, GenerateContentResponse};

static DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse API key header")]
    InvalidApiKey,

    #[error("failed to construct url (suffix {suffix}): {source}")]
    ConstructUrl {
        #[source]
        source: url::ParseError,
        suffix: String,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        #[source]
        source: reqwest::Error,
        url: String,
    },

    #[error("bad response from gemini (status {status}): {body}")]
    BadResponse { status: u16, body: String },

    #[error("failed to decode gemini response: {0}")]
    Decode(#[from] reqwest::Error),
}

/// A thin wrapper over `reqwest` targeting the Gemini `generateContent` and
/// `embedContent` REST endpoints.
pub struct GeminiClient {
    http: Client,
    base_url: Url,
}

impl GeminiClient {
    pub fn new(api_key: impl AsRef<str>) -> Result<Self, Error> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl AsRef<str>, base_url: &str) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-goog-api-key"),
            HeaderValue::from_str(api_key.as_ref()).map_err(|_| Error::InvalidApiKey)?,
        );
        let http = Client::builder()
            .default_headers(headers)
            .build()
            .expect("reqwest client configuration is always valid here");
        let base_url = Url::parse(base_url)
            .map_err(|source| Error::ConstructUrl { source, suffix: base_url.to_string() })?;
        Ok(Self { http, base_url })
    }

    fn model_url(&self, model: &str, method: &str) -> Result<Url, Error> {
        let suffix = format!("models/{model}:{method}");
        self.base_url
            .join(&suffix)
            .map_err(|source| Error::ConstructUrl { source, suffix })
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::BadResponse { status: status.as_u16(), body })
        }
    }

    #[instrument(skip(self, request), fields(model))]
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, Error> {
        let url = self.model_url(model, "generateContent")?;
        let response = self
            .http
            .post(url.clone())
            .json(request)
            .send()
            .await
            .map_err(|source| Error::Request { source, url: url.to_string() })?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self, request), fields(model))]
    pub async fn batch_embed_contents(
        &self,
        model: &str,
        request: &EmbedContentRequest,
    ) -> Result<EmbedContentResponse, Error> {
        let url = self.model_url(model, "batchEmbedContents")?;
        let response = self
            .http
            .post(url.clone())
            .json(request)
            .send()
            .await
            .map_err(|source| Error::Request { source, url: url.to_string() })?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }
}
