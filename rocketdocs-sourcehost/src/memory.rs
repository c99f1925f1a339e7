//! A synthetic, fully in-process [`SourceHost`] used by tests and by the
//! `file-docs` single-file jobs when the caller already has bytes in hand.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rocketdocs_core::error::CoreError;
use rocketdocs_core::sourcehost::{EntryKind, RepoHandle, SourceEntry, SourceHost};

/// One file in a synthetic tree, keyed by slash-separated path relative to
/// the repository root (`""` denotes the root directory itself).
#[derive(Debug, Clone)]
pub struct InMemoryFile {
    pub path: String,
    pub content: Vec<u8>,
}

/// An in-memory repository tree, built from a flat list of file paths and
/// contents; directories are derived implicitly from path prefixes.
#[derive(Debug, Clone, Default)]
pub struct InMemorySourceHost {
    files: BTreeMap<String, Vec<u8>>,
    repo_name: String,
}

impl InMemorySourceHost {
    pub fn new(repo_name: impl Into<String>, files: Vec<InMemoryFile>) -> Self {
        Self {
            repo_name: repo_name.into(),
            files: files.into_iter().map(|f| (f.path, f.content)).collect(),
        }
    }

    fn immediate_children(&self, relative_path: &str) -> Vec<SourceEntry> {
        let prefix = if relative_path.is_empty() { String::new() } else { format!("{relative_path}/") };
        let mut seen_dirs = std::collections::BTreeSet::new();
        let mut entries = Vec::new();

        for (path, content) in &self.files {
            let Some(rest) = path.strip_prefix(&prefix) else { continue };
            if rest.is_empty() {
                continue;
            }
            match rest.split_once('/') {
                None => entries.push(SourceEntry {
                    name: rest.to_string(),
                    path: path.clone(),
                    html_url: format!("memory://{}/{path}", self.repo_name),
                    kind: EntryKind::File,
                    size: Some(content.len() as u64),
                    content: Some(content.clone()),
                }),
                Some((dir, _)) => {
                    if seen_dirs.insert(dir.to_string()) {
                        let dir_path = format!("{prefix}{dir}");
                        entries.push(SourceEntry {
                            name: dir.to_string(),
                            path: dir_path.clone(),
                            html_url: format!("memory://{}/{dir_path}", self.repo_name),
                            kind: EntryKind::Dir,
                            size: None,
                            content: None,
                        });
                    }
                }
            }
        }
        entries
    }
}

#[async_trait]
impl SourceHost for InMemorySourceHost {
    async fn resolve(&self, url: &str) -> Result<RepoHandle, CoreError> {
        if url.trim().is_empty() {
            return Err(CoreError::InvalidUrl(url.to_string()));
        }
        Ok(RepoHandle {
            full_name: self.repo_name.clone(),
            html_url: url.to_string(),
            version: Some("memory".to_string()),
        })
    }

    async fn list_children(
        &self,
        _repo: &RepoHandle,
        relative_path: &str,
    ) -> Result<Vec<SourceEntry>, CoreError> {
        Ok(self.immediate_children(relative_path))
    }

    async fn fetch_content(
        &self,
        _repo: &RepoHandle,
        entry: &SourceEntry,
    ) -> Result<Vec<u8>, CoreError> {
        if let Some(content) = &entry.content {
            return Ok(content.clone());
        }
        self.files
            .get(&entry.path)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(entry.path.clone()))
    }
}
