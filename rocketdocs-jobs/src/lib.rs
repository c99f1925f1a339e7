//! The Job Controller (C11): accepts repo/file jobs from the HTTP
//! surface, drives them on owned `JoinHandle`s (never fire-and-forget),
//! and exposes status/get/delete over a job registry.

use std::collections::HashMap;
use std::sync::Arc;

use rocketdocs_core::docstore::DocumentStore;
use rocketdocs_core::error::CoreError;
use rocketdocs_core::sourcehost::{RepoHandle, SourceHost};
use rocketdocs_core::tokenizer::Tokenizer;
use rocketdocs_generator::Generator;
use rocketdocs_model::Gateway;
use rocketdocs_rag::{Chunker, EmbeddingPipeline, VectorIndex};
use rocketdocs_scheduler::Scheduler;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

const DEFAULT_BATCH_SIZE: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Repo,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Completed,
    Failed(String),
}

struct JobRecord {
    kind: JobKind,
    handle: JoinHandle<Result<(), CoreError>>,
    cancel: CancellationToken,
    outcome: Option<Result<(), String>>,
}

/// Owns every in-flight repo/file generation task. One instance per
/// process; the HTTP surface holds it behind an `Arc`.
pub struct JobController {
    store: Arc<dyn DocumentStore>,
    source_host: Arc<dyn SourceHost>,
    gateway: Arc<Gateway>,
    tokenizer: Arc<dyn Tokenizer>,
    index: Arc<dyn VectorIndex>,
    chunker: Arc<Chunker>,
    batch_size: usize,
    jobs: Mutex<HashMap<String, JobRecord>>,
}

impl JobController {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        source_host: Arc<dyn SourceHost>,
        gateway: Arc<Gateway>,
        tokenizer: Arc<dyn Tokenizer>,
        index: Arc<dyn VectorIndex>,
        chunker: Arc<Chunker>,
    ) -> Self {
        Self {
            store,
            source_host,
            gateway,
            tokenizer,
            index,
            chunker,
            batch_size: DEFAULT_BATCH_SIZE,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Enqueue whole-repository generation. Refuses with
    /// [`CoreError::BusyError`] if a job with this id is already running.
    /// On successful completion of every document, purges and rebuilds the
    /// repository's embedding namespace (the decided re-embed-on-regeneration
    /// policy applies uniformly to first-time and repeat runs).
    #[instrument(skip(self, repo_handle), fields(repo_id = %repo_id))]
    pub async fn enqueue_repo_job(
        &self,
        owner_id: &str,
        repo_id: &str,
        model: &str,
        embedding_model: &str,
        repo_handle: RepoHandle,
    ) -> Result<String, CoreError> {
        self.reject_if_running(repo_id).await?;

        let store = self.store.clone();
        let source_host = self.source_host.clone();
        let gateway = self.gateway.clone();
        let tokenizer = self.tokenizer.clone();
        let index = self.index.clone();
        let chunker = self.chunker.clone();
        let batch_size = self.batch_size;
        let owner_id = owner_id.to_string();
        let repo_id_owned = repo_id.to_string();
        let model = model.to_string();
        let embedding_model = embedding_model.to_string();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let handle: JoinHandle<Result<(), CoreError>> = tokio::spawn(async move {
            let store = &*store;
            let source_host = &*source_host;
            let gateway = &*gateway;
            let tokenizer = &*tokenizer;
            let generator = Generator::new(store, source_host, gateway, tokenizer);
            let scheduler = Scheduler::new(store, &generator).with_batch_size(batch_size);
            let repo = scheduler.run(&owner_id, &repo_id_owned, &model, &repo_handle, task_cancel).await?;

            if let Err(err) = index.delete_namespace(&repo_id_owned).await {
                warn!(repo_id = %repo_id_owned, %err, "failed to purge embedding namespace before re-embedding");
                return Err(err);
            }
            let pipeline = EmbeddingPipeline::new(&chunker, gateway, &*index);
            pipeline.run(&repo, &embedding_model).await?;
            Ok(())
        });

        self.jobs
            .lock()
            .await
            .insert(repo_id.to_string(), JobRecord { kind: JobKind::Repo, handle, cancel, outcome: None });
        Ok(repo_id.to_string())
    }

    /// Enqueue single-document generation.
    #[instrument(skip(self, repo_handle), fields(doc_id = %doc_id))]
    pub async fn enqueue_file_job(
        &self,
        owner_id: &str,
        doc_id: &str,
        model: &str,
        repo_handle: RepoHandle,
    ) -> Result<String, CoreError> {
        self.reject_if_running(doc_id).await?;

        let store = self.store.clone();
        let source_host = self.source_host.clone();
        let gateway = self.gateway.clone();
        let tokenizer = self.tokenizer.clone();
        let owner_id = owner_id.to_string();
        let doc_id_owned = doc_id.to_string();
        let model = model.to_string();
        let cancel = CancellationToken::new();

        let handle: JoinHandle<Result<(), CoreError>> = tokio::spawn(async move {
            let store = &*store;
            let source_host = &*source_host;
            let gateway = &*gateway;
            let tokenizer = &*tokenizer;
            let generator = Generator::new(store, source_host, gateway, tokenizer);
            generator.generate(&owner_id, &doc_id_owned, &model, &repo_handle, None).await.map(|_| ())
        });

        self.jobs
            .lock()
            .await
            .insert(doc_id.to_string(), JobRecord { kind: JobKind::File, handle, cancel, outcome: None });
        Ok(doc_id.to_string())
    }

    /// Poll a job's status without blocking on its completion.
    pub async fn status(&self, job_id: &str) -> Option<JobStatus> {
        let mut jobs = self.jobs.lock().await;
        let record = jobs.get_mut(job_id)?;
        if !record.handle.is_finished() {
            return Some(JobStatus::Running);
        }
        Some(Self::resolve_finished(record).await)
    }

    /// The kind of job tracked under `job_id`, if any.
    pub async fn get(&self, job_id: &str) -> Option<JobKind> {
        self.jobs.lock().await.get(job_id).map(|r| r.kind)
    }

    /// Cancel an in-flight job (signals its `CancellationToken` and aborts
    /// its task) and stop tracking it. Idempotent if the job is unknown or
    /// already finished.
    pub async fn delete(&self, job_id: &str) -> Result<(), CoreError> {
        if let Some(record) = self.jobs.lock().await.remove(job_id) {
            record.cancel.cancel();
            record.handle.abort();
        }
        Ok(())
    }

    async fn reject_if_running(&self, job_id: &str) -> Result<(), CoreError> {
        let jobs = self.jobs.lock().await;
        if let Some(record) = jobs.get(job_id) {
            if !record.handle.is_finished() {
                return Err(CoreError::BusyError(job_id.to_string()));
            }
        }
        Ok(())
    }

    /// Await a completed handle exactly once and cache its outcome;
    /// `JoinHandle` must not be polled again after returning `Ready`.
    async fn resolve_finished(record: &mut JobRecord) -> JobStatus {
        if let Some(outcome) = &record.outcome {
            return to_status(outcome);
        }
        let outcome = match (&mut record.handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(core_err)) => Err(core_err.to_string()),
            Err(join_err) if join_err.is_cancelled() => Err("cancelled".to_string()),
            Err(join_err) => Err(format!("job panicked: {join_err}")),
        };
        record.outcome = Some(outcome.clone());
        to_status(&outcome)
    }
}

fn to_status(outcome: &Result<(), String>) -> JobStatus {
    match outcome {
        Ok(()) => JobStatus::Completed,
        Err(message) => JobStatus::Failed(message.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocketdocs_core::document::{DocKind, Document, Repository, StatusEnum};
    use rocketdocs_docstore::InMemoryDocumentStore;
    use rocketdocs_model::mock::MockProvider;
    use rocketdocs_sourcehost::memory::{InMemoryFile, InMemorySourceHost};
    use rocketdocs_core::tokenizer::WhitespaceTokenizer;
    use std::collections::HashMap as Map;
    use std::time::Duration;

    fn controller(
        store: InMemoryDocumentStore,
        host: InMemorySourceHost,
    ) -> JobController {
        let gateway = Gateway::new().with_provider(Arc::new(MockProvider::new("mock")));
        let index = Arc::new(rocketdocs_rag::InMemoryVectorIndex::new());
        let chunker = Arc::new(rocketdocs_rag::Chunker::new(Box::new(WhitespaceTokenizer)));
        JobController::new(
            Arc::new(store),
            Arc::new(host),
            Arc::new(gateway),
            Arc::new(WhitespaceTokenizer),
            index,
            chunker,
        )
    }

    async fn single_file_repo() -> (InMemoryDocumentStore, InMemorySourceHost, RepoHandle) {
        let host = InMemorySourceHost::new(
            "demo",
            vec![InMemoryFile { path: "a.py".to_string(), content: b"print(1)".to_vec() }],
        );
        let repo_handle = host.resolve("https://example.com/demo").await.unwrap();

        let mut docs = Map::new();
        let root =
            Document::new("root".into(), "repo1".into(), "owner1".into(), "u".into(), "".into(), DocKind::Dir, None);
        let a = Document::new(
            "a".into(),
            "repo1".into(),
            "owner1".into(),
            "u".into(),
            "a.py".into(),
            DocKind::File,
            Some(8),
        );
        docs.insert(root.id.clone(), root);
        docs.insert(a.id.clone(), a);
        let mut dependencies = Map::new();
        dependencies.insert("root".to_string(), None);
        dependencies.insert("a".to_string(), Some("root".to_string()));

        let store = InMemoryDocumentStore::new();
        store
            .batch_create_repo(Repository {
                id: "repo1".into(),
                owner_id: "owner1".into(),
                repo_name: "demo".into(),
                root_doc_id: "root".into(),
                version: None,
                dependencies,
                docs,
                status: StatusEnum::NotStarted,
            })
            .await
            .unwrap();
        (store, host, repo_handle)
    }

    #[tokio::test]
    async fn repo_job_reaches_completed_status() {
        let (store, host, repo_handle) = single_file_repo().await;
        let store_handle = store.clone();
        let controller = controller(store, host);

        controller.enqueue_repo_job("owner1", "repo1", "mock-1", "mock-embed", repo_handle).await.unwrap();

        let mut status = controller.status("repo1").await;
        for _ in 0..50 {
            if matches!(status, Some(JobStatus::Completed) | Some(JobStatus::Failed(_))) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            status = controller.status("repo1").await;
        }
        assert_eq!(status, Some(JobStatus::Completed));
        let repo = store_handle.get_repo("owner1", "repo1").await.unwrap();
        assert_eq!(repo.status, StatusEnum::Completed);
    }

    #[tokio::test]
    async fn a_job_already_running_is_rejected() {
        let (store, host, repo_handle) = single_file_repo().await;
        let controller = controller(store, host);

        controller.enqueue_repo_job("owner1", "repo1", "mock-1", "mock-embed", repo_handle.clone()).await.unwrap();
        let err =
            controller.enqueue_repo_job("owner1", "repo1", "mock-1", "mock-embed", repo_handle).await.unwrap_err();
        assert!(matches!(err, CoreError::BusyError(_)));
    }

    #[tokio::test]
    async fn delete_cancels_an_in_flight_job_and_forgets_it() {
        let (store, host, repo_handle) = single_file_repo().await;
        let controller = controller(store, host);

        controller.enqueue_repo_job("owner1", "repo1", "mock-1", "mock-embed", repo_handle).await.unwrap();
        controller.delete("repo1").await.unwrap();
        assert_eq!(controller.get("repo1").await, None);
    }

    #[tokio::test]
    async fn file_job_completes_and_reports_its_kind() {
        let (store, host, repo_handle) = single_file_repo().await;
        let controller = controller(store, host);

        controller.enqueue_file_job("owner1", "a", "mock-1", repo_handle).await.unwrap();
        assert_eq!(controller.get("a").await, Some(JobKind::File));

        let mut status = controller.status("a").await;
        for _ in 0..50 {
            if matches!(status, Some(JobStatus::Completed) | Some(JobStatus::Failed(_))) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            status = controller.status("a").await;
        }
        assert_eq!(status, Some(JobStatus::Completed));
    }
}
