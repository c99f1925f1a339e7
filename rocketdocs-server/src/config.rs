//! Typed, env-driven configuration (§6, ambient addition): one injected
//! value gathering source-host tokens, LLM provider keys, the vector
//! index name, the blob bucket name, allowed CORS origins, and the
//! scheduler/chunker overrides, loaded the way the teacher's examples
//! load a `.env` file via `dotenvy` + `envy`.

use serde::Deserialize;

fn default_vector_index_name() -> String {
    "rocketdocs".to_string()
}

fn default_batch_size() -> usize {
    30
}

fn default_chunk_size() -> usize {
    250
}

fn default_chunk_minimum() -> usize {
    100
}

fn default_model() -> String {
    "mock-1".to_string()
}

fn default_embedding_model() -> String {
    "mock-embed".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

/// Environment-driven configuration for a Rocketdocs server process.
///
/// Field names map to `SCREAMING_SNAKE_CASE` environment variables via
/// `envy` (e.g. `vector_index_name` <- `VECTOR_INDEX_NAME`).
#[derive(Debug, Clone, Deserialize)]
pub struct RocketdocsConfig {
    #[serde(default)]
    pub source_host_token: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_vector_index_name")]
    pub vector_index_name: String,
    #[serde(default)]
    pub blob_bucket_name: Option<String>,
    #[serde(default)]
    pub allowed_cors_origins: String,
    #[serde(default = "default_batch_size")]
    pub scheduler_batch_size: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_minimum")]
    pub chunk_minimum: usize,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_embedding_model")]
    pub default_embedding_model: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for RocketdocsConfig {
    fn default() -> Self {
        Self {
            source_host_token: None,
            gemini_api_key: None,
            openai_api_key: None,
            vector_index_name: default_vector_index_name(),
            blob_bucket_name: None,
            allowed_cors_origins: String::new(),
            scheduler_batch_size: default_batch_size(),
            chunk_size: default_chunk_size(),
            chunk_minimum: default_chunk_minimum(),
            default_model: default_model(),
            default_embedding_model: default_embedding_model(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl RocketdocsConfig {
    pub fn builder() -> RocketdocsConfigBuilder {
        RocketdocsConfigBuilder::default()
    }

    /// Load `.env` (if present) then the process environment, matching
    /// the teacher's `dotenvy::dotenv().ok()` + `envy::from_env()` idiom.
    pub fn from_env() -> Result<Self, envy::Error> {
        let _ = dotenvy::dotenv();
        envy::from_env::<RocketdocsConfig>()
    }

    /// Parsed, trimmed list of allowed CORS origins (comma-separated in
    /// the raw environment variable).
    pub fn cors_origins(&self) -> Vec<String> {
        self.allowed_cors_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Builder mirroring the teacher's `RagConfig`/`GeminiBuilder` pattern,
/// for callers assembling a config in-process rather than from the
/// environment (tests, embedders).
#[derive(Debug, Clone, Default)]
pub struct RocketdocsConfigBuilder {
    config: RocketdocsConfigOverrides,
}

#[derive(Debug, Clone, Default)]
struct RocketdocsConfigOverrides {
    source_host_token: Option<String>,
    gemini_api_key: Option<String>,
    openai_api_key: Option<String>,
    vector_index_name: Option<String>,
    blob_bucket_name: Option<String>,
    allowed_cors_origins: Option<String>,
    scheduler_batch_size: Option<usize>,
    chunk_size: Option<usize>,
    chunk_minimum: Option<usize>,
    default_model: Option<String>,
    default_embedding_model: Option<String>,
    bind_addr: Option<String>,
}

impl RocketdocsConfigBuilder {
    pub fn source_host_token(mut self, token: impl Into<String>) -> Self {
        self.config.source_host_token = Some(token.into());
        self
    }

    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.gemini_api_key = Some(key.into());
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openai_api_key = Some(key.into());
        self
    }

    pub fn vector_index_name(mut self, name: impl Into<String>) -> Self {
        self.config.vector_index_name = Some(name.into());
        self
    }

    pub fn allowed_cors_origins(mut self, origins: impl Into<String>) -> Self {
        self.config.allowed_cors_origins = Some(origins.into());
        self
    }

    pub fn scheduler_batch_size(mut self, size: usize) -> Self {
        self.config.scheduler_batch_size = Some(size);
        self
    }

    pub fn chunk_sizes(mut self, chunk_size: usize, chunk_minimum: usize) -> Self {
        self.config.chunk_size = Some(chunk_size);
        self.config.chunk_minimum = Some(chunk_minimum);
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = Some(model.into());
        self
    }

    pub fn default_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_embedding_model = Some(model.into());
        self
    }

    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = Some(addr.into());
        self
    }

    pub fn build(self) -> RocketdocsConfig {
        let defaults = RocketdocsConfig::default();
        RocketdocsConfig {
            source_host_token: self.config.source_host_token.or(defaults.source_host_token),
            gemini_api_key: self.config.gemini_api_key.or(defaults.gemini_api_key),
            openai_api_key: self.config.openai_api_key.or(defaults.openai_api_key),
            vector_index_name: self.config.vector_index_name.unwrap_or(defaults.vector_index_name),
            blob_bucket_name: self.config.blob_bucket_name.or(defaults.blob_bucket_name),
            allowed_cors_origins: self.config.allowed_cors_origins.unwrap_or(defaults.allowed_cors_origins),
            scheduler_batch_size: self.config.scheduler_batch_size.unwrap_or(defaults.scheduler_batch_size),
            chunk_size: self.config.chunk_size.unwrap_or(defaults.chunk_size),
            chunk_minimum: self.config.chunk_minimum.unwrap_or(defaults.chunk_minimum),
            default_model: self.config.default_model.unwrap_or(defaults.default_model),
            default_embedding_model: self
                .config
                .default_embedding_model
                .unwrap_or(defaults.default_embedding_model),
            bind_addr: self.config.bind_addr.unwrap_or(defaults.bind_addr),
        }
    }
}
