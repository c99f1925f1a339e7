//! The Document Store seam (C4).
//!
//! Persists per-document and per-repository records with status fields,
//! atomic batch writes, and ownership-scoped queries. The in-process
//! implementation lives in `rocketdocs-docstore`; this trait is the only
//! thing the rest of the workspace depends on.

use async_trait::async_trait;

use crate::document::{Document, Repository, StatusEnum};
use crate::error::CoreError;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a freshly identified repository (and all of its documents)
    /// atomically: either every document is visible afterwards or none are.
    async fn batch_create_repo(&self, repo: Repository) -> Result<(), CoreError>;

    /// Fetch a repository owned by `owner_id`.
    async fn get_repo(&self, owner_id: &str, repo_id: &str) -> Result<Repository, CoreError>;

    /// List every repository owned by `owner_id`.
    async fn list_repos(&self, owner_id: &str) -> Result<Vec<Repository>, CoreError>;

    /// Replace the stored copy of `repo` (used by the scheduler to persist
    /// status changes as a run progresses).
    async fn put_repo(&self, repo: Repository) -> Result<(), CoreError>;

    /// Delete a repository and all of its documents.
    async fn delete_repo(&self, owner_id: &str, repo_id: &str) -> Result<(), CoreError>;

    /// Fetch a single document owned by `owner_id`.
    async fn get_document(&self, owner_id: &str, doc_id: &str) -> Result<Document, CoreError>;

    /// Replace the stored copy of a document.
    async fn put_document(&self, doc: Document) -> Result<(), CoreError>;

    /// Delete a single document (used by the file-docs `DELETE` endpoint).
    async fn delete_document(&self, owner_id: &str, doc_id: &str) -> Result<(), CoreError>;

    /// Atomically transition `doc_id` to `InProgress`, refusing with
    /// [`CoreError::BusyError`] if it is already `InProgress`.
    async fn begin_generation(&self, owner_id: &str, doc_id: &str) -> Result<Document, CoreError> {
        let mut doc = self.get_document(owner_id, doc_id).await?;
        if doc.status == StatusEnum::InProgress {
            return Err(CoreError::BusyError(doc_id.to_string()));
        }
        doc.status = StatusEnum::InProgress;
        self.put_document(doc.clone()).await?;
        Ok(doc)
    }
}
