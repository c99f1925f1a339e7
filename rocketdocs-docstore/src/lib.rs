//! The in-process Document Store (C4).
//!
//! Backs `documentation` and `repos` with `tokio::sync::RwLock<HashMap<...>>`,
//! matching the teacher's in-memory store pattern. A durable backend
//! (Postgres, DynamoDB, ...) is a drop-in implementation of
//! `rocketdocs_core::DocumentStore`; only this seam is load-bearing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rocketdocs_core::document::{Document, Repository};
use rocketdocs_core::docstore::DocumentStore;
use rocketdocs_core::error::CoreError;
use tokio::sync::RwLock;
use tracing::instrument;

#[derive(Debug, Default)]
struct Inner {
    repos: HashMap<String, Repository>,
    documents: HashMap<String, Document>,
}

/// An in-memory `DocumentStore`. Safe to share across tasks via `Arc`.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_owner<'a>(owner_id: &str, repo: &'a Repository) -> Result<&'a Repository, CoreError> {
    if repo.owner_id != owner_id {
        return Err(CoreError::NotOwner(repo.id.clone()));
    }
    Ok(repo)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    #[instrument(skip(self, repo), fields(repo_id = %repo.id))]
    async fn batch_create_repo(&self, repo: Repository) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        for document in repo.docs.values() {
            inner.documents.insert(document.id.clone(), document.clone());
        }
        inner.repos.insert(repo.id.clone(), repo);
        Ok(())
    }

    async fn get_repo(&self, owner_id: &str, repo_id: &str) -> Result<Repository, CoreError> {
        let inner = self.inner.read().await;
        let repo = inner.repos.get(repo_id).ok_or_else(|| CoreError::NotFound(repo_id.to_string()))?;
        check_owner(owner_id, repo)?;
        Ok(repo.clone())
    }

    async fn list_repos(&self, owner_id: &str) -> Result<Vec<Repository>, CoreError> {
        let inner = self.inner.read().await;
        Ok(inner.repos.values().filter(|r| r.owner_id == owner_id).cloned().collect())
    }

    #[instrument(skip(self, repo), fields(repo_id = %repo.id))]
    async fn put_repo(&self, repo: Repository) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        inner.repos.insert(repo.id.clone(), repo);
        Ok(())
    }

    async fn delete_repo(&self, owner_id: &str, repo_id: &str) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        let repo = inner.repos.get(repo_id).ok_or_else(|| CoreError::NotFound(repo_id.to_string()))?;
        check_owner(owner_id, repo)?;
        let doc_ids: Vec<String> = repo.docs.keys().cloned().collect();
        inner.repos.remove(repo_id);
        for doc_id in doc_ids {
            inner.documents.remove(&doc_id);
        }
        Ok(())
    }

    async fn get_document(&self, owner_id: &str, doc_id: &str) -> Result<Document, CoreError> {
        let inner = self.inner.read().await;
        let doc = inner.documents.get(doc_id).ok_or_else(|| CoreError::NotFound(doc_id.to_string()))?;
        if doc.owner_id != owner_id {
            return Err(CoreError::NotOwner(doc_id.to_string()));
        }
        Ok(doc.clone())
    }

    #[instrument(skip(self, doc), fields(doc_id = %doc.id))]
    async fn put_document(&self, doc: Document) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        if let Some(repo) = inner.repos.get_mut(&doc.repo_id) {
            repo.docs.insert(doc.id.clone(), doc.clone());
        }
        inner.documents.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn delete_document(&self, owner_id: &str, doc_id: &str) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        let doc = inner.documents.get(doc_id).ok_or_else(|| CoreError::NotFound(doc_id.to_string()))?;
        if doc.owner_id != owner_id {
            return Err(CoreError::NotOwner(doc_id.to_string()));
        }
        let repo_id = doc.repo_id.clone();
        inner.documents.remove(doc_id);
        if let Some(repo) = inner.repos.get_mut(&repo_id) {
            repo.docs.remove(doc_id);
        }
        Ok(())
    }
}
