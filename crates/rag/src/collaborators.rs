//! Interfaces to the models and indexes the pipeline consumes. Every
//! implementation is shared across request threads.

use anyhow::{anyhow, Result};
use clauselens_core::ChunkId;
use clauselens_index::{Bm25Index, FlatIndex};
use serde::{Deserialize, Serialize};

pub trait Embedder: Send + Sync {
    fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut output = self.embed_batch(&[text.to_string()])?;
        output
            .pop()
            .ok_or_else(|| anyhow!("embedder returned no vector"))
    }

    /// Identifies the model so indexes built with another one are refused.
    fn label(&self) -> String;
}

pub trait VectorSearch: Send + Sync {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(ChunkId, f32)>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait LexicalScorer: Send + Sync {
    /// One score per chunk id, in corpus order.
    fn scores(&self, query_tokens: &[String]) -> Result<Vec<f32>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait RelevanceScorer: Send + Sync {
    /// One score per passage, in input order.
    fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSpan {
    pub answer: String,
    pub score: f64,
}

pub trait SpanExtractor: Send + Sync {
    /// `Ok(None)` means the context holds no answer.
    fn extract(&self, question: &str, context: &str) -> Result<Option<ExtractedSpan>>;
}

/// Ids of the `k` highest scores; ties go to the lower id. Zero scores are
/// eligible.
pub fn top_k_by_score(scores: &[f32], k: usize) -> Vec<ChunkId> {
    let mut ids: Vec<ChunkId> = (0..scores.len()).collect();
    ids.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    ids.truncate(k);
    ids
}

impl VectorSearch for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(ChunkId, f32)>> {
        Ok(FlatIndex::search(self, query, k)?)
    }

    fn len(&self) -> usize {
        FlatIndex::len(self)
    }
}

impl LexicalScorer for Bm25Index {
    fn scores(&self, query_tokens: &[String]) -> Result<Vec<f32>> {
        Ok(Bm25Index::scores(self, query_tokens))
    }

    fn len(&self) -> usize {
        Bm25Index::len(self)
    }
}
