pub mod citation;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod remote;
pub mod request;
pub mod rerank;
pub mod response;
pub mod retrieval;

pub use citation::format_citation;
pub use collaborators::{
    top_k_by_score, Embedder, ExtractedSpan, LexicalScorer, RelevanceScorer, SpanExtractor,
    VectorSearch,
};
pub use config::{ClauseLensConfig, EmbedderConfig, ExtractorConfig, RerankerConfig};
pub use context::{Collaborators, PipelineSettings, RetrievalIndex, ServingContext};
pub use embedding::{EmbeddingBackend, EmbeddingClient};
pub use error::RagError;
pub use extract::{AnswerSelector, ExtractedAnswer, SentenceExtractor};
pub use pipeline::{answer, ask};
pub use remote::{HttpRelevanceScorer, HttpSpanExtractor};
pub use request::{AnswerMode, AskRequest, RawAskRequest};
pub use rerank::{rerank, Candidate, OverlapScorer, ScoredCandidate};
pub use response::{AskResponse, ABSTAIN_MESSAGE, ABSTRACTIVE_NOTE};
pub use retrieval::{dense_candidates, fuse_candidates, lexical_candidates};
