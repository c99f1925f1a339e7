//! Text Chunker (C5), Vector Index (C6), and Embedding Pipeline (C9).

mod chunker;
mod pipeline;
mod vectorindex;

pub use chunker::Chunker;
pub use pipeline::EmbeddingPipeline;
pub use vectorindex::{ChunkRecord, InMemoryVectorIndex, ScoredChunk, VectorIndex};
