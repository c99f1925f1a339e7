//! Structured logging and span capture shared by every Rocketdocs service.
//!
//! [`init`] wires a `tracing-subscriber` `fmt` layer for local development;
//! [`init_with_storage`] additionally attaches [`memory::InMemoryTraceLayer`]
//! so tests and the debug UI can inspect captured spans without a collector.

pub mod memory;

pub use memory::{SharedTraceStorage, SpanData, SpanStatus};

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize a process-wide `fmt` subscriber, respecting `RUST_LOG`.
///
/// Returns the guard produced by `tracing::subscriber::set_default` so
/// callers (mainly tests) can scope the subscriber to the current thread;
/// production binaries should call this once at startup and drop the guard
/// at the end of `main`.
pub fn init() -> tracing::subscriber::DefaultGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_default(subscriber)
}

/// Like [`init`], but also captures every closed span into `storage`.
pub fn init_with_storage(storage: Arc<SharedTraceStorage>) -> tracing::subscriber::DefaultGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(memory::InMemoryTraceLayer::new(storage));
    tracing::subscriber::set_default(subscriber)
}
