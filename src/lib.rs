#![warn(missing_docs)]
//! Core library for the minirag retrieval-augmented answering pipeline.

pub mod chunker;
pub mod config;
pub mod embedder;
pub mod generator;
pub mod index;
pub mod loader;
pub mod rag;

pub use chunker::chunk_text;
pub use config::{Settings, SharedArgs};
pub use embedder::{Embedder, EmbeddingTask, RetryPolicy};
pub use generator::TextGenerator;
pub use index::{ChunkMetadata, IndexRecord, IndexSummary, SearchHit, VectorIndex};
pub use loader::{load_paths, LoadedDocument};
pub use rag::{AnswerOutcome, Citation, RagEngine, NO_ANSWER_FALLBACK};
