//! Shared application state injected into every handler.

use std::collections::HashMap;
use std::sync::Arc;

use rocketdocs_core::docstore::DocumentStore;
use rocketdocs_core::sourcehost::{RepoHandle, SourceHost};
use rocketdocs_core::tokenizer::Tokenizer;
use rocketdocs_jobs::JobController;
use rocketdocs_model::Gateway;
use rocketdocs_rag::{Chunker, VectorIndex};
use tokio::sync::Mutex;

use crate::config::RocketdocsConfig;

/// Everything a handler needs, grouped the way the teacher's `AppState`
/// groups its runner/session/artifact services.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub source_host: Arc<dyn SourceHost>,
    pub gateway: Arc<Gateway>,
    pub tokenizer: Arc<dyn Tokenizer>,
    pub index: Arc<dyn VectorIndex>,
    pub chunker: Arc<Chunker>,
    pub jobs: Arc<JobController>,
    pub config: Arc<RocketdocsConfig>,
    /// Resolved [`RepoHandle`]s for standalone file-doc jobs, keyed by
    /// `doc_id`. File documents have no backing `Repository` to carry a
    /// handle on, so regeneration needs this side table to refetch source
    /// content without re-resolving the URL from scratch.
    pub file_doc_handles: Arc<Mutex<HashMap<String, RepoHandle>>>,
}
