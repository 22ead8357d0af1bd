//! Summarization pipeline: text preparation, chunking, embedding, indexing, clustering, and
//! map-reduce composition.

pub mod chunking;
pub mod clustering;
pub mod compose;
pub mod format;
pub mod indexer;
pub mod normalize;
pub mod sentences;
mod service;
pub mod types;

pub use service::SummaryPipeline;
pub use types::{
    Document, Embedding, ErrorKind, PipelineError, PipelineOutcome, PipelineSettings,
    PipelineSetupError, SearchError, SimilarChunk, TextChunk, TextStage,
};
