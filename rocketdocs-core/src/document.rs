//! The Document/Repository data model (§3 of the design).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a single [`Document`].
///
/// Transitions: `NotStarted -> InProgress -> {Completed, Failed}`, exactly
/// once per generation attempt. Regeneration resets to `InProgress` only
/// from a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusEnum {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl StatusEnum {
    /// Terminal states are the only ones regeneration may start from.
    pub fn is_terminal(self) -> bool {
        matches!(self, StatusEnum::Completed | StatusEnum::Failed)
    }
}

/// Whether a [`Document`] represents a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    File,
    Dir,
}

/// Structured extraction produced alongside the markdown body.
///
/// `description` is the one field every kind promises; callers that need
/// more structure can still read the raw map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extracted {
    pub description: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Token-count bookkeeping for a single generation attempt.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    pub fn add(&mut self, other: Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// The unit of generated documentation: one file or directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub repo_id: String,
    pub owner_id: String,
    pub source_url: String,
    pub relative_path: String,
    pub kind: DocKind,
    pub size_bytes: Option<u64>,
    pub status: StatusEnum,
    pub extracted: Option<Extracted>,
    pub markdown: Option<String>,
    pub usage: Usage,
}

impl Document {
    pub fn new(
        id: String,
        repo_id: String,
        owner_id: String,
        source_url: String,
        relative_path: String,
        kind: DocKind,
        size_bytes: Option<u64>,
    ) -> Self {
        Self {
            id,
            repo_id,
            owner_id,
            source_url,
            relative_path,
            kind,
            size_bytes,
            status: StatusEnum::NotStarted,
            extracted: None,
            markdown: None,
            usage: Usage::default(),
        }
    }
}

/// The container: a set of [`Document`]s plus the dependency tree linking them.
///
/// `dependencies` maps child id to parent id (the root maps to `None`). Child
/// lists are never persisted; they are reconstructed by inverting this map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub owner_id: String,
    pub repo_name: String,
    pub root_doc_id: String,
    pub version: Option<String>,
    pub dependencies: HashMap<String, Option<String>>,
    pub docs: HashMap<String, Document>,
    pub status: StatusEnum,
}

impl Repository {
    /// `true` once every document has reached `Completed`.
    pub fn all_completed(&self) -> bool {
        self.docs.values().all(|d| d.status == StatusEnum::Completed)
    }

    /// `true` if any document has reached `Failed`.
    pub fn any_failed(&self) -> bool {
        self.docs.values().any(|d| d.status == StatusEnum::Failed)
    }

    /// Children of `doc_id`, derived by inverting `dependencies`.
    pub fn children_of(&self, doc_id: &str) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter_map(|(child, parent)| {
                if parent.as_deref() == Some(doc_id) { Some(child.as_str()) } else { None }
            })
            .collect()
    }
}

/// A tree-shaped view of a [`Repository`], reconstructed for display (used by
/// the `GET /repos/{repo_id}` endpoint and the embedding traversal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoTreeNode {
    pub id: String,
    pub relative_path: String,
    pub kind: DocKind,
    pub status: StatusEnum,
    pub children: Vec<RepoTreeNode>,
}

/// Rebuild the child-list tree of a repository by breadth-first traversal of
/// `dependencies`, rooted at `root_doc_id`. Mirrors the original's
/// `_format_repo`: child lists are never stored, only derived.
pub fn format_repo_tree(repo: &Repository) -> Option<RepoTreeNode> {
    fn build(repo: &Repository, id: &str) -> Option<RepoTreeNode> {
        let doc = repo.docs.get(id)?;
        let mut children: Vec<&str> = repo.children_of(id);
        children.sort();
        let children = children.into_iter().filter_map(|c| build(repo, c)).collect();
        Some(RepoTreeNode {
            id: doc.id.clone(),
            relative_path: doc.relative_path.clone(),
            kind: doc.kind,
            status: doc.status,
            children,
        })
    }
    build(repo, &repo.root_doc_id)
}
