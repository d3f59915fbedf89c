//! Resume-to-job matching core: text normalization, a hybrid lexical scorer,
//! hashed embeddings and a persisted exact vector index.

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod normalize;
pub mod pipeline;
pub mod scoring;
pub mod snapshot;
pub mod vector_ops;

pub use config::{Number, Settings};
pub use document::{Document, ResumeSubmission};
pub use embedding::{embed, EmbeddingGenerator, EmbeddingVector};
pub use error::{MatchError, Result};
pub use index::{SearchHit, VectorIndex};
pub use normalize::normalize;
pub use pipeline::{MatchingPipeline, ScoreFilter, ScoredCandidate};
pub use scoring::{score, score_breakdown, LexicalScorer, ScoreResult};
pub use snapshot::SnapshotStatus;
