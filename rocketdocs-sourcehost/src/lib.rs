//! The Source Host Adapter (C2).
//!
//! Resolves a repository URL into a tree of file/directory entries with
//! decoded contents. Two implementations ship: [`InMemorySourceHost`] (a
//! synthetic tree for tests) and [`GitHubSourceHost`] (a real adapter
//! over the public GitHub contents API). Swapping in a GitLab/Bitbucket
//! adapter, or a local-checkout adapter, is routine — only the
//! `rocketdocs_core::SourceHost` trait is load-bearing.

pub mod github;
pub mod memory;

pub use github::GitHubSourceHost;
pub use memory::InMemorySourceHost;
