//! The Vector Index (C6): namespaced upsert/query/delete of embedded
//! chunks with metadata.

use std::collections::HashMap;

use async_trait::async_trait;
use rocketdocs_core::error::CoreError;
use tokio::sync::RwLock;

/// One embedded chunk, keyed by `vector_id = doc_id + "-" + ordinal`.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub vector_id: String,
    pub embedding: Vec<f32>,
    pub chunk_text: String,
    pub doc_id: String,
}

/// A scored chunk returned by [`VectorIndex::query`].
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub doc_id: String,
    pub score: f32,
    pub chunk_text: String,
}

/// A namespaced store of embedded chunks. Namespaces correspond 1:1 with
/// `repo_id`; there is no cross-namespace query.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create a namespace, refusing with [`CoreError::NamespaceConflict`]
    /// if one already exists for `namespace`.
    async fn create_namespace(&self, namespace: &str) -> Result<(), CoreError>;

    /// Delete a namespace and all of its chunks. A no-op if absent.
    async fn delete_namespace(&self, namespace: &str) -> Result<(), CoreError>;

    /// Upsert chunks into a namespace.
    async fn upsert(&self, namespace: &str, chunks: &[ChunkRecord]) -> Result<(), CoreError>;

    /// Query the `top_k` most similar chunks in `namespace`.
    async fn query(
        &self,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, CoreError>;
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// An in-memory `VectorIndex`, namespaces keyed by `repo_id`. Backed by a
/// `HashMap` guarded by `tokio::sync::RwLock`, mirroring the teacher's
/// in-memory vector store pattern.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    namespaces: RwLock<HashMap<String, HashMap<String, ChunkRecord>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn create_namespace(&self, namespace: &str) -> Result<(), CoreError> {
        let mut namespaces = self.namespaces.write().await;
        if namespaces.contains_key(namespace) {
            return Err(CoreError::NamespaceConflict(namespace.to_string()));
        }
        namespaces.insert(namespace.to_string(), HashMap::new());
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), CoreError> {
        let mut namespaces = self.namespaces.write().await;
        namespaces.remove(namespace);
        Ok(())
    }

    async fn upsert(&self, namespace: &str, chunks: &[ChunkRecord]) -> Result<(), CoreError> {
        let mut namespaces = self.namespaces.write().await;
        let store = namespaces
            .entry(namespace.to_string())
            .or_default();
        for chunk in chunks {
            store.insert(chunk.vector_id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, CoreError> {
        let namespaces = self.namespaces.read().await;
        let Some(store) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredChunk> = store
            .values()
            .map(|chunk| ScoredChunk {
                doc_id: chunk.doc_id.clone(),
                score: cosine_similarity(&chunk.embedding, embedding),
                chunk_text: chunk.chunk_text.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}
