//! The Identifier (C3): walks a repository's source tree breadth-first,
//! applies inclusion/exclusion heuristics, assigns stable ids, and emits
//! the documentation dependency DAG.

mod classifier;
mod exclusions;

pub use classifier::{ExtensionClassifier, SourceClassifier};
pub use exclusions::IdentifierConfig;

use std::collections::HashMap;

use rocketdocs_core::document::{DocKind, Document, Repository, StatusEnum};
use rocketdocs_core::docstore::DocumentStore;
use rocketdocs_core::error::CoreError;
use rocketdocs_core::sourcehost::{EntryKind, RepoHandle, SourceEntry, SourceHost};
use tracing::{info, instrument};

/// One item the caller may want to show before committing to generation
/// (`POST /repos/identify`'s `items_to_document`).
#[derive(Debug, Clone)]
pub struct IdentifiedItem {
    pub id: String,
    pub path: String,
    pub kind: DocKind,
}

struct PendingNode {
    entry: SourceEntry,
    kind: DocKind,
}

/// Walks `repo_url`'s tree via `source_host`, builds the documentation
/// DAG, and returns the assembled [`Repository`] without persisting it —
/// callers call [`Identifier::persist`] (or inline the
/// `batch_create_repo` call) once they're ready to commit.
pub struct Identifier<'a> {
    source_host: &'a dyn SourceHost,
    config: IdentifierConfig,
    classifier: Box<dyn SourceClassifier>,
}

impl<'a> Identifier<'a> {
    pub fn new(source_host: &'a dyn SourceHost) -> Self {
        Self {
            source_host,
            config: IdentifierConfig::default(),
            classifier: Box::new(ExtensionClassifier),
        }
    }

    pub fn with_config(mut self, config: IdentifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_classifier(mut self, classifier: Box<dyn SourceClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Run the identification pass, returning the assembled (but not yet
    /// persisted) repository.
    #[instrument(skip(self, id_gen), fields(url = %repo_url))]
    pub async fn identify(
        &self,
        repo_url: &str,
        owner_id: &str,
        repo_id: &str,
        mut id_gen: impl FnMut() -> String,
    ) -> Result<Repository, CoreError> {
        let handle = self.source_host.resolve(repo_url).await?;

        let root_id = id_gen();
        let mut docs: HashMap<String, Document> = HashMap::new();
        let mut dependencies: HashMap<String, Option<String>> = HashMap::new();
        let mut children_of: HashMap<String, Vec<String>> = HashMap::new();

        docs.insert(
            root_id.clone(),
            Document::new(
                root_id.clone(),
                repo_id.to_string(),
                owner_id.to_string(),
                handle.html_url.clone(),
                String::new(),
                DocKind::Dir,
                None,
            ),
        );
        dependencies.insert(root_id.clone(), None);

        // Breadth-first walk: a FIFO queue of directories whose children
        // still need listing, each carrying its already-assigned id.
        let mut queue: Vec<(String, String)> = vec![(String::new(), root_id.clone())];

        while !queue.is_empty() {
            let mut next_queue = Vec::new();
            for (relative_path, parent_id) in queue {
                let entries = self.source_host.list_children(&handle, &relative_path).await?;
                let pending = self.filter_entries(&handle, entries).await?;

                for node in pending {
                    let PendingNode { entry, kind } = node;
                    let id = id_gen();
                    docs.insert(
                        id.clone(),
                        Document::new(
                            id.clone(),
                            repo_id.to_string(),
                            owner_id.to_string(),
                            entry.html_url.clone(),
                            entry.path.clone(),
                            kind,
                            entry.size,
                        ),
                    );
                    dependencies.insert(id.clone(), Some(parent_id.clone()));
                    children_of.entry(parent_id.clone()).or_default().push(id.clone());

                    if kind == DocKind::Dir {
                        next_queue.push((entry.path.clone(), id));
                    }
                }
            }
            queue = next_queue;
        }

        prune_empty_directories(&root_id, &mut docs, &mut dependencies, &children_of);

        info!(doc_count = docs.len(), "identification complete");

        Ok(Repository {
            id: repo_id.to_string(),
            owner_id: owner_id.to_string(),
            repo_name: handle.full_name,
            root_doc_id: root_id,
            version: handle.version,
            dependencies,
            docs,
            status: StatusEnum::NotStarted,
        })
    }

    async fn filter_entries(
        &self,
        handle: &RepoHandle,
        entries: Vec<SourceEntry>,
    ) -> Result<Vec<PendingNode>, CoreError> {
        let mut out = Vec::new();
        for entry in entries {
            match entry.kind {
                EntryKind::Dir => {
                    if self.config.excludes_dir(&entry.name) {
                        continue;
                    }
                    out.push(PendingNode { entry, kind: DocKind::Dir });
                }
                EntryKind::File => {
                    if self.config.excludes_file_name(&entry.name) {
                        continue;
                    }
                    if let Some(size) = entry.size {
                        if size > self.config.max_file_bytes {
                            continue;
                        }
                    }
                    let content = match &entry.content {
                        Some(content) => content.clone(),
                        None => self.source_host.fetch_content(handle, &entry).await?,
                    };
                    if !self.classifier.is_source_code(&entry.name, &content) {
                        continue;
                    }
                    out.push(PendingNode { entry, kind: DocKind::File });
                }
            }
        }
        Ok(out)
    }
}

/// Recursively delete subtrees that contain (transitively) only empty
/// directories, so no all-pruned directory ever becomes a document.
fn prune_empty_directories(
    root_id: &str,
    docs: &mut HashMap<String, Document>,
    dependencies: &mut HashMap<String, Option<String>>,
    children_of: &HashMap<String, Vec<String>>,
) {
    fn has_documentable_descendant(
        id: &str,
        docs: &HashMap<String, Document>,
        children_of: &HashMap<String, Vec<String>>,
    ) -> bool {
        let Some(children) = children_of.get(id) else { return false };
        children.iter().any(|child| match docs.get(child).map(|d| d.kind) {
            Some(DocKind::File) => true,
            Some(DocKind::Dir) => has_documentable_descendant(child, docs, children_of),
            None => false,
        })
    }

    fn collect_prunable(
        id: &str,
        docs: &HashMap<String, Document>,
        children_of: &HashMap<String, Vec<String>>,
        out: &mut Vec<String>,
    ) {
        let Some(children) = children_of.get(id) else { return };
        for child in children {
            if docs.get(child).map(|d| d.kind) == Some(DocKind::Dir) {
                if has_documentable_descendant(child, docs, children_of) {
                    collect_prunable(child, docs, children_of, out);
                } else {
                    out.push(child.clone());
                }
            }
        }
    }

    let mut to_remove = Vec::new();
    collect_prunable(root_id, docs, children_of, &mut to_remove);

    fn remove_subtree(
        id: &str,
        docs: &mut HashMap<String, Document>,
        dependencies: &mut HashMap<String, Option<String>>,
        children_of: &HashMap<String, Vec<String>>,
    ) {
        if let Some(children) = children_of.get(id) {
            for child in children.clone() {
                remove_subtree(&child, docs, dependencies, children_of);
            }
        }
        docs.remove(id);
        dependencies.remove(id);
    }

    for id in to_remove {
        remove_subtree(&id, docs, dependencies, children_of);
    }
}

/// Persist a freshly identified [`Repository`] atomically through the
/// Document Store's batch API — the last step of `§4.4`.
pub async fn persist(store: &dyn DocumentStore, repo: Repository) -> Result<Repository, CoreError> {
    store.batch_create_repo(repo.clone()).await?;
    Ok(repo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocketdocs_docstore::InMemoryDocumentStore;
    use rocketdocs_sourcehost::memory::{InMemoryFile, InMemorySourceHost};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn next_id_gen() -> impl FnMut() -> String {
        let counter = AtomicU64::new(0);
        move || format!("id-{}", counter.fetch_add(1, Ordering::SeqCst))
    }

    #[tokio::test]
    async fn s1_trivial_repo_identifies_one_file_under_root() {
        let host = InMemorySourceHost::new(
            "demo",
            vec![InMemoryFile { path: "a.py".to_string(), content: b"print(1)".to_vec() }],
        );
        let identifier = Identifier::new(&host);
        let repo = identifier
            .identify("https://example.com/demo", "owner1", "repo1", next_id_gen())
            .await
            .unwrap();

        assert_eq!(repo.docs.len(), 2); // root + a.py
        let root = &repo.docs[&repo.root_doc_id];
        assert_eq!(root.kind, DocKind::Dir);
        let children = repo.children_of(&repo.root_doc_id);
        assert_eq!(children.len(), 1);
        assert_eq!(repo.docs[children[0]].relative_path, "a.py");
    }

    #[tokio::test]
    async fn s2_dependency_order_builds_nested_dag() {
        let host = InMemorySourceHost::new(
            "demo",
            vec![InMemoryFile { path: "pkg/f.py".to_string(), content: b"print(2)".to_vec() }],
        );
        let identifier = Identifier::new(&host);
        let repo = identifier
            .identify("https://example.com/demo", "owner1", "repo1", next_id_gen())
            .await
            .unwrap();

        // root -> pkg -> f.py
        assert_eq!(repo.docs.len(), 3);
        let root_children = repo.children_of(&repo.root_doc_id);
        assert_eq!(root_children.len(), 1);
        let pkg_id = root_children[0].to_string();
        assert_eq!(repo.docs[&pkg_id].kind, DocKind::Dir);
        let pkg_children = repo.children_of(&pkg_id);
        assert_eq!(repo.docs[pkg_children[0]].relative_path, "pkg/f.py");
    }

    #[tokio::test]
    async fn s3_oversized_file_is_excluded() {
        let host = InMemorySourceHost::new(
            "demo",
            vec![InMemoryFile { path: "huge.py".to_string(), content: vec![b'a'; 500_000] }],
        );
        let identifier = Identifier::new(&host);
        let repo = identifier
            .identify("https://example.com/demo", "owner1", "repo1", next_id_gen())
            .await
            .unwrap();
        assert_eq!(repo.docs.len(), 1); // only the root remains
    }

    #[tokio::test]
    async fn excluded_directories_and_binary_suffixes_are_dropped() {
        let host = InMemorySourceHost::new(
            "demo",
            vec![
                InMemoryFile { path: "node_modules/x.js".to_string(), content: b"x".to_vec() },
                InMemoryFile { path: "a.png".to_string(), content: b"x".to_vec() },
                InMemoryFile { path: "src/main.rs".to_string(), content: b"fn main() {}".to_vec() },
            ],
        );
        let identifier = Identifier::new(&host);
        let repo = identifier
            .identify("https://example.com/demo", "owner1", "repo1", next_id_gen())
            .await
            .unwrap();

        let paths: Vec<&str> = repo.docs.values().map(|d| d.relative_path.as_str()).collect();
        assert!(paths.iter().any(|p| *p == "src/main.rs"));
        assert!(!paths.iter().any(|p| p.contains("node_modules")));
        assert!(!paths.iter().any(|p| p.ends_with(".png")));
    }

    #[tokio::test]
    async fn persist_writes_through_to_the_document_store() {
        let host = InMemorySourceHost::new(
            "demo",
            vec![InMemoryFile { path: "a.py".to_string(), content: b"print(1)".to_vec() }],
        );
        let identifier = Identifier::new(&host);
        let repo = identifier
            .identify("https://example.com/demo", "owner1", "repo1", next_id_gen())
            .await
            .unwrap();

        let store = InMemoryDocumentStore::new();
        persist(&store, repo).await.unwrap();
        let fetched = store.get_repo("owner1", "repo1").await.unwrap();
        assert_eq!(fetched.docs.len(), 2);
    }
}
