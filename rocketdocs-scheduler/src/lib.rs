//! The Repo Scheduler (C8): drives whole-repository generation as a
//! topological, bounded-concurrency walk over the documentation
//! dependency DAG, with fail-fast partial-failure semantics.

use std::collections::HashMap;

use rocketdocs_core::document::{Repository, StatusEnum};
use rocketdocs_core::docstore::DocumentStore;
use rocketdocs_core::error::CoreError;
use rocketdocs_core::sourcehost::RepoHandle;
use rocketdocs_generator::Generator;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

const DEFAULT_BATCH_SIZE: usize = 30;

pub struct Scheduler<'a> {
    store: &'a dyn DocumentStore,
    generator: &'a Generator<'a>,
    batch_size: usize,
}

impl<'a> Scheduler<'a> {
    pub fn new(store: &'a dyn DocumentStore, generator: &'a Generator<'a>) -> Self {
        Self { store, generator, batch_size: DEFAULT_BATCH_SIZE }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Drive generation of every document in `repo_id`, respecting the
    /// dependency DAG (directories only generate once every child has
    /// completed). Aborts the whole run on the first failed sub-batch,
    /// leaving already-completed documents in place (no rollback).
    #[instrument(skip(self, repo_handle, cancel), fields(repo_id = %repo_id))]
    pub async fn run(
        &self,
        owner_id: &str,
        repo_id: &str,
        model: &str,
        repo_handle: &RepoHandle,
        cancel: CancellationToken,
    ) -> Result<Repository, CoreError> {
        let repo = self.store.get_repo(owner_id, repo_id).await?;

        let mut children_of: HashMap<String, Vec<String>> = HashMap::new();
        let mut indegree: HashMap<String, usize> = HashMap::new();
        for id in repo.docs.keys() {
            let children: Vec<String> = repo.children_of(id).into_iter().map(str::to_string).collect();
            indegree.insert(id.clone(), children.len());
            children_of.insert(id.clone(), children);
        }

        let mut current_level: Vec<String> =
            indegree.iter().filter(|(_, count)| **count == 0).map(|(id, _)| id.clone()).collect();
        current_level.sort();

        let mut processed = 0usize;
        let mut failure: Option<CoreError> = None;
        let mut cancelled = false;

        'rounds: while !current_level.is_empty() {
            let mut next_level = Vec::new();

            for sub_batch in current_level.chunks(self.batch_size) {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'rounds;
                }

                let futures = sub_batch.iter().map(|id| {
                    let child_ids = children_of.get(id).cloned();
                    self.generator.generate(owner_id, id, model, repo_handle, child_ids.as_deref())
                });
                let results = futures::future::join_all(futures).await;

                if let Some(err) = results.iter().find_map(|r| r.as_ref().err()) {
                    warn!(repo_id = %repo_id, error = %err, "sub-batch failed, aborting run");
                    failure = Some(clone_error(err));
                    break 'rounds;
                }

                for (id, result) in sub_batch.iter().zip(results) {
                    processed += 1;
                    let _ = result;
                    if let Some(parent) = repo.dependencies.get(id).and_then(|p| p.as_ref()) {
                        if let Some(count) = indegree.get_mut(parent) {
                            *count -= 1;
                            if *count == 0 {
                                next_level.push(parent.clone());
                            }
                        }
                    }
                }
            }

            next_level.sort();
            current_level = next_level;
        }

        let mut final_repo = repo;
        if let Some(err) = failure {
            final_repo.status = StatusEnum::Failed;
            self.store.put_repo(final_repo.clone()).await?;
            return Err(err);
        }
        if cancelled {
            info!(repo_id = %repo_id, processed, "run cancelled before completion");
            return Ok(final_repo);
        }

        final_repo.status = StatusEnum::Completed;
        self.store.put_repo(final_repo.clone()).await?;
        info!(repo_id = %repo_id, processed, "repository generation complete");
        Ok(final_repo)
    }
}

/// `CoreError` is not `Clone`; rebuild an equivalent value for the
/// `FAILED` write path without consuming the original from the results
/// vector we still need to iterate.
fn clone_error(err: &CoreError) -> CoreError {
    CoreError::UpstreamIo { source: "scheduler".to_string(), message: err.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocketdocs_core::document::{DocKind, Document};
    use rocketdocs_core::tokenizer::WhitespaceTokenizer;
    use rocketdocs_docstore::InMemoryDocumentStore;
    use rocketdocs_model::mock::{MockProvider, MockResponse};
    use rocketdocs_model::Gateway;
    use rocketdocs_sourcehost::memory::{InMemoryFile, InMemorySourceHost};
    use std::collections::HashMap as Map;
    use std::sync::Arc;

    fn nested_repo() -> (Repository, InMemorySourceHost) {
        let host = InMemorySourceHost::new(
            "demo",
            vec![
                InMemoryFile { path: "a.py".to_string(), content: b"print(1)".to_vec() },
                InMemoryFile { path: "pkg/b.py".to_string(), content: b"print(2)".to_vec() },
            ],
        );

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
        let pkg = Document::new(
            "pkg".into(),
            "repo1".into(),
            "owner1".into(),
            "u".into(),
            "pkg".into(),
            DocKind::Dir,
            None,
        );
        let b = Document::new(
            "b".into(),
            "repo1".into(),
            "owner1".into(),
            "u".into(),
            "pkg/b.py".into(),
            DocKind::File,
            Some(8),
        );
        docs.insert(root.id.clone(), root);
        docs.insert(a.id.clone(), a);
        docs.insert(pkg.id.clone(), pkg);
        docs.insert(b.id.clone(), b);

        let mut dependencies = Map::new();
        dependencies.insert("root".to_string(), None);
        dependencies.insert("a".to_string(), Some("root".to_string()));
        dependencies.insert("pkg".to_string(), Some("root".to_string()));
        dependencies.insert("b".to_string(), Some("pkg".to_string()));

        let repo = Repository {
            id: "repo1".into(),
            owner_id: "owner1".into(),
            repo_name: "demo".into(),
            root_doc_id: "root".into(),
            version: None,
            dependencies,
            docs,
            status: StatusEnum::NotStarted,
        };
        (repo, host)
    }

    #[tokio::test]
    async fn generates_the_whole_dag_in_dependency_order() {
        let (repo, host) = nested_repo();
        let store = InMemoryDocumentStore::new();
        store.batch_create_repo(repo).await.unwrap();

        let gateway = Gateway::new().with_provider(Arc::new(MockProvider::new("mock")));
        let tokenizer = WhitespaceTokenizer;
        let generator = Generator::new(&store, &host, &gateway, &tokenizer);
        let scheduler = Scheduler::new(&store, &generator);
        let repo_handle = host.resolve("https://example.com/demo").await.unwrap();

        let result = scheduler.run("owner1", "repo1", "mock-1", &repo_handle, CancellationToken::new()).await.unwrap();
        assert_eq!(result.status, StatusEnum::Completed);

        for id in ["root", "a", "pkg", "b"] {
            let doc = store.get_document("owner1", id).await.unwrap();
            assert_eq!(doc.status, StatusEnum::Completed, "{id} should be completed");
        }
    }

    #[tokio::test]
    async fn a_leaf_failure_marks_the_repo_failed_and_aborts_the_run() {
        let (repo, host) = nested_repo();
        let store = InMemoryDocumentStore::new();
        store.batch_create_repo(repo).await.unwrap();

        let provider = MockProvider::new("mock");
        provider.push(MockResponse::UpstreamError("boom".to_string())).await;
        let gateway = Gateway::new().with_provider(Arc::new(provider));
        let tokenizer = WhitespaceTokenizer;
        let generator = Generator::new(&store, &host, &gateway, &tokenizer);
        let scheduler = Scheduler::new(&store, &generator);
        let repo_handle = host.resolve("https://example.com/demo").await.unwrap();

        let err = scheduler.run("owner1", "repo1", "mock-1", &repo_handle, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::UpstreamIo { .. }));

        let repo = store.get_repo("owner1", "repo1").await.unwrap();
        assert_eq!(repo.status, StatusEnum::Failed);
        // root was never reached because its dependency failed
        let root = store.get_document("owner1", "root").await.unwrap();
        assert_eq!(root.status, StatusEnum::NotStarted);
    }

    #[tokio::test]
    async fn a_cancelled_token_stops_the_run_before_further_batches() {
        let (repo, host) = nested_repo();
        let store = InMemoryDocumentStore::new();
        store.batch_create_repo(repo).await.unwrap();

        let gateway = Gateway::new().with_provider(Arc::new(MockProvider::new("mock")));
        let tokenizer = WhitespaceTokenizer;
        let generator = Generator::new(&store, &host, &gateway, &tokenizer);
        let scheduler = Scheduler::new(&store, &generator).with_batch_size(1);
        let repo_handle = host.resolve("https://example.com/demo").await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = scheduler.run("owner1", "repo1", "mock-1", &repo_handle, cancel).await.unwrap();
        assert_ne!(result.status, StatusEnum::Completed);
    }
}
