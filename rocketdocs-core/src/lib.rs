//! Shared domain types, traits, and error taxonomy for Rocketdocs.
//!
//! This crate is the seam layer: every other crate in the workspace depends
//! on it and nothing else circularly. It defines no concrete behavior of
//! its own beyond a couple of default trait methods; everything that talks
//! to a real provider lives in a leaf crate that implements these traits.

pub mod docstore;
pub mod document;
pub mod error;
pub mod model;
pub mod sourcehost;
pub mod tokenizer;

pub use docstore::DocumentStore;
pub use document::{
    DocKind, Document, Extracted, RepoTreeNode, Repository, StatusEnum, Usage, format_repo_tree,
};
pub use error::{CoreError, Result};
pub use model::{FinishReason, LlmProvider, TextRequest, TextResponse};
pub use sourcehost::{EntryKind, RepoHandle, SourceEntry, SourceHost};
pub use tokenizer::{Tokenizer, WhitespaceTokenizer};
