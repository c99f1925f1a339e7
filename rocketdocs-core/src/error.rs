//! Error taxonomy shared by every Rocketdocs crate.
//!
//! Variants are grouped the way the design doc groups them: input, auth,
//! state, upstream, LLM semantics, and programming errors. Every variant
//! carries the identifiers needed to log or respond without re-parsing a
//! message string.

use thiserror::Error;

/// Errors shared across the documentation pipeline.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The supplied repository URL could not be resolved.
    #[error("invalid repository url: {0}")]
    InvalidUrl(String),

    /// A required input was empty (e.g. an empty query or empty file).
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// No (or an invalid) bearer credential was presented.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The caller does not own the resource it addressed.
    #[error("not owner of resource {0}")]
    NotOwner(String),

    /// A document is `IN_PROGRESS` and cannot accept a new generation request.
    #[error("document {0} is busy (already in progress)")]
    BusyError(String),

    /// The vector index already has a namespace for this repository.
    #[error("namespace already exists: {0}")]
    NamespaceConflict(String),

    /// A downstream collaborator (source host, LLM, store, vector index) failed.
    #[error("upstream io error ({source}): {message}")]
    UpstreamIo { source: String, message: String },

    /// The LLM stopped generating because it hit the completion token budget.
    #[error("llm response truncated for model {model}")]
    LlmTruncated { model: String },

    /// The LLM's JSON output could not be parsed/validated against the schema.
    #[error("could not parse llm json output: {0}")]
    LlmParseError(String),

    /// A document's generated markdown was empty after trimming.
    #[error("markdown content was empty for document {0}")]
    MarkdownEmpty(String),

    /// A document was generated before all of its children completed.
    #[error("dependency not ready: document {0} has an incomplete child")]
    DependencyNotReady(String),

    /// A `Document.kind` that the caller did not expect to see.
    #[error("unsupported document kind: {0}")]
    UnsupportedKind(String),

    /// A lookup by id found nothing.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Convenience result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CoreError>;
