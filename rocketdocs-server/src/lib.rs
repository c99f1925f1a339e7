//! The HTTP Surface (C12): a thin `axum` layer in front of the Job
//! Controller and the Agent/Search read paths (§6). Bearer-token-shaped
//! owner extraction lives in [`auth`]; everything else is routing and
//! request/response mapping.

pub mod auth;
pub mod config;
pub mod error;
pub mod rest;
pub mod state;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use rocketdocs_core::tokenizer::WhitespaceTokenizer;
use rocketdocs_docstore::InMemoryDocumentStore;
use rocketdocs_jobs::JobController;
use rocketdocs_model::gemini::GeminiProvider;
use rocketdocs_model::mock::MockProvider;
use rocketdocs_model::openai::OpenAiCompatibleProvider;
use rocketdocs_model::Gateway;
use rocketdocs_rag::{Chunker, InMemoryVectorIndex};
use rocketdocs_sourcehost::github::GitHubSourceHost;
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::RocketdocsConfig;
use crate::state::AppState;

/// Assembles the default, in-process wiring of every collaborator trait
/// and returns a ready-to-serve `Router`. A deployment that needs a
/// durable store or a real vector database swaps these constructors for
/// its own, since every seam is a trait object behind an `Arc`.
pub fn build_app(config: RocketdocsConfig) -> Router {
    let store = Arc::new(InMemoryDocumentStore::new());
    let source_host = Arc::new(GitHubSourceHost::new(config.source_host_token.clone()));
    let tokenizer = Arc::new(WhitespaceTokenizer);
    let index = Arc::new(InMemoryVectorIndex::new());
    let chunker = Arc::new(Chunker::new(Box::new(WhitespaceTokenizer)).with_sizes(config.chunk_size, config.chunk_minimum));

    let mut gateway = Gateway::new().with_provider(Arc::new(MockProvider::new("mock")));
    if let Some(key) = config.gemini_api_key.clone() {
        match GeminiProvider::new(key) {
            Ok(provider) => gateway = gateway.with_provider(Arc::new(provider)),
            Err(err) => warn!(%err, "gemini api key rejected, falling back to mock provider only"),
        }
    }
    if let Some(key) = config.openai_api_key.clone() {
        gateway = gateway.with_provider(Arc::new(OpenAiCompatibleProvider::new(key, "gpt-")));
    }
    let gateway = Arc::new(gateway);

    let jobs = Arc::new(JobController::new(
        store.clone() as Arc<dyn rocketdocs_core::docstore::DocumentStore>,
        source_host.clone() as Arc<dyn rocketdocs_core::sourcehost::SourceHost>,
        gateway.clone(),
        tokenizer.clone() as Arc<dyn rocketdocs_core::tokenizer::Tokenizer>,
        index.clone() as Arc<dyn rocketdocs_rag::VectorIndex>,
        chunker.clone(),
    ).with_batch_size(config.scheduler_batch_size));

    let state = AppState {
        store: store as Arc<dyn rocketdocs_core::docstore::DocumentStore>,
        source_host: source_host as Arc<dyn rocketdocs_core::sourcehost::SourceHost>,
        gateway,
        tokenizer: tokenizer as Arc<dyn rocketdocs_core::tokenizer::Tokenizer>,
        index: index as Arc<dyn rocketdocs_rag::VectorIndex>,
        chunker,
        jobs,
        config: Arc::new(config),
        file_doc_handles: Arc::new(Mutex::new(HashMap::new())),
    };

    rest::router(state)
}
