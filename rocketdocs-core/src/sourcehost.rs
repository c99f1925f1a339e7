//! The Source Host Adapter seam (C2).
//!
//! Resolves a repository URL to a tree of file/directory entries with
//! decoded contents, sizes, and stable per-entry URLs. The concrete
//! provider (GitHub, GitLab, a local checkout) is swappable; only the
//! interface is specified here, per §1's scope note.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A handle identifying one resolved repository/version pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoHandle {
    pub full_name: String,
    pub html_url: String,
    pub version: Option<String>,
}

/// Whether a listed entry is a file or directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry returned by [`SourceHost::list_children`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub path: String,
    pub html_url: String,
    pub kind: EntryKind,
    pub size: Option<u64>,
    /// Decoded file content; `None` for directories or when not yet fetched.
    pub content: Option<Vec<u8>>,
}

/// Resolves repository URLs into browsable trees of [`SourceEntry`].
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Resolve `url` into a repository handle. Fails with
    /// [`CoreError::InvalidUrl`] if the url cannot be parsed/resolved.
    async fn resolve(&self, url: &str) -> Result<RepoHandle, CoreError>;

    /// List the immediate children of `relative_path` (`""` is the root).
    async fn list_children(
        &self,
        repo: &RepoHandle,
        relative_path: &str,
    ) -> Result<Vec<SourceEntry>, CoreError>;

    /// Fetch the decoded content of a single file entry, if not already
    /// populated by [`SourceHost::list_children`].
    async fn fetch_content(
        &self,
        repo: &RepoHandle,
        entry: &SourceEntry,
    ) -> Result<Vec<u8>, CoreError>;
}
