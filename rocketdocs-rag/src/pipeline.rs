//! The Embedding Pipeline (C9): traverse completed documentation, chunk
//! it, batch-embed, and upsert into the Vector Index under a per-repo
//! namespace.

use rocketdocs_core::document::{Repository, StatusEnum};
use rocketdocs_core::error::CoreError;
use rocketdocs_model::Gateway;
use tracing::{info, instrument};

use crate::chunker::Chunker;
use crate::vectorindex::{ChunkRecord, VectorIndex};

const EMBED_BATCH_SIZE: usize = 2048;
const UPSERT_BATCH_SIZE: usize = 100;

pub struct EmbeddingPipeline<'a> {
    chunker: &'a Chunker,
    gateway: &'a Gateway,
    index: &'a dyn VectorIndex,
}

impl<'a> EmbeddingPipeline<'a> {
    pub fn new(chunker: &'a Chunker, gateway: &'a Gateway, index: &'a dyn VectorIndex) -> Self {
        Self { chunker, gateway, index }
    }

    /// Embed and index every `COMPLETED` document in `repo`, under
    /// namespace `repo.id`. Refuses with [`CoreError::NamespaceConflict`]
    /// if that namespace already exists.
    #[instrument(skip(self, repo), fields(repo_id = %repo.id))]
    pub async fn run(&self, repo: &Repository, model: &str) -> Result<usize, CoreError> {
        self.index.create_namespace(&repo.id).await?;

        struct Pending {
            doc_id: String,
            ordinal: u32,
            text: String,
        }

        let mut pending = Vec::new();
        for doc in repo.docs.values() {
            if doc.status != StatusEnum::Completed {
                continue;
            }
            let Some(markdown) = doc.markdown.as_deref() else { continue };
            for (ordinal, text) in self.chunker.chunk(markdown).into_iter().enumerate() {
                pending.push(Pending { doc_id: doc.id.clone(), ordinal: ordinal as u32, text });
            }
        }

        let total = pending.len();
        for batch in pending.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let embeddings = self.gateway.generate_embedding(model, &texts).await?;

            let records: Vec<ChunkRecord> = batch
                .iter()
                .zip(embeddings)
                .map(|(p, embedding)| ChunkRecord {
                    vector_id: format!("{}-{}", p.doc_id, p.ordinal),
                    embedding,
                    chunk_text: p.text.clone(),
                    doc_id: p.doc_id.clone(),
                })
                .collect();

            for sub_batch in records.chunks(UPSERT_BATCH_SIZE) {
                self.index.upsert(&repo.id, sub_batch).await?;
            }
        }

        info!(chunk_count = total, "embedding pipeline complete");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocketdocs_core::document::{DocKind as Kind, Document, StatusEnum as Status};
    use rocketdocs_core::tokenizer::WhitespaceTokenizer;
    use rocketdocs_model::mock::MockProvider;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn completed_doc(id: &str, repo_id: &str, markdown: &str) -> Document {
        let mut doc = Document::new(
            id.to_string(),
            repo_id.to_string(),
            "owner1".to_string(),
            "https://example.com".to_string(),
            format!("{id}.rs"),
            Kind::File,
            Some(markdown.len() as u64),
        );
        doc.status = Status::Completed;
        doc.markdown = Some(markdown.to_string());
        doc
    }

    fn sample_repo() -> Repository {
        let mut docs = HashMap::new();
        let root = Document::new(
            "root".into(),
            "repo1".into(),
            "owner1".into(),
            "https://example.com".into(),
            "".into(),
            Kind::Dir,
            None,
        );
        let doc_a = completed_doc("a", "repo1", "# a.rs\n\nDescribes a small module with one function.");
        docs.insert(root.id.clone(), root);
        docs.insert(doc_a.id.clone(), doc_a);
        let mut dependencies = HashMap::new();
        dependencies.insert("root".to_string(), None);
        dependencies.insert("a".to_string(), Some("root".to_string()));
        Repository {
            id: "repo1".into(),
            owner_id: "owner1".into(),
            repo_name: "demo".into(),
            root_doc_id: "root".into(),
            version: None,
            dependencies,
            docs,
            status: Status::Completed,
        }
    }

    #[tokio::test]
    async fn embeds_and_indexes_completed_documents_only() {
        let chunker = Chunker::new(Box::new(WhitespaceTokenizer));
        let gateway = Gateway::new().with_provider(Arc::new(MockProvider::new("mock")));
        let index = crate::vectorindex::InMemoryVectorIndex::new();
        let pipeline = EmbeddingPipeline::new(&chunker, &gateway, &index);

        let repo = sample_repo();
        let count = pipeline.run(&repo, "mock-embed").await.unwrap();
        assert!(count >= 1);

        let results = index.query("repo1", &[0.0], 5).await.unwrap();
        assert!(!results.is_empty());
    }

    #[tokio::test]
    async fn directory_documents_are_embedded_alongside_files() {
        let chunker = Chunker::new(Box::new(WhitespaceTokenizer));
        let gateway = Gateway::new().with_provider(Arc::new(MockProvider::new("mock")));
        let index = crate::vectorindex::InMemoryVectorIndex::new();
        let pipeline = EmbeddingPipeline::new(&chunker, &gateway, &index);

        let mut repo = sample_repo();
        repo.docs.get_mut("root").unwrap().markdown =
            Some("# demo\n\nSummarizes the directory's one module.".to_string());
        repo.docs.get_mut("root").unwrap().status = Status::Completed;

        let count = pipeline.run(&repo, "mock-embed").await.unwrap();
        assert!(count >= 2, "expected chunks from both the directory and the file");

        let results = index.query("repo1", &[0.0], 10).await.unwrap();
        assert!(results.iter().any(|r| r.doc_id == "root"), "directory doc should be indexed");
        assert!(results.iter().any(|r| r.doc_id == "a"), "file doc should still be indexed");
    }

    #[tokio::test]
    async fn refuses_when_namespace_already_exists() {
        let chunker = Chunker::new(Box::new(WhitespaceTokenizer));
        let gateway = Gateway::new().with_provider(Arc::new(MockProvider::new("mock")));
        let index = crate::vectorindex::InMemoryVectorIndex::new();
        index.create_namespace("repo1").await.unwrap();
        let pipeline = EmbeddingPipeline::new(&chunker, &gateway, &index);

        let err = pipeline.run(&sample_repo(), "mock-embed").await.unwrap_err();
        assert!(matches!(err, CoreError::NamespaceConflict(_)));
    }
}
