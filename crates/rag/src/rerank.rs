use std::collections::HashSet;

use anyhow::{anyhow, Result};
use clauselens_core::{tokenize, Chunk, ChunkId};
use tracing::debug;

use crate::collaborators::RelevanceScorer;
use crate::error::RagError;

#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub chunk_id: ChunkId,
    pub chunk: &'a Chunk,
}

/// A candidate tagged with its relevance score for one request.
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate<'a> {
    pub chunk_id: ChunkId,
    pub chunk: &'a Chunk,
    pub rerank_score: f32,
}

/// Scores all candidates against the query, keeps input order on ties and
/// returns at most `top_k`. Any scorer problem fails the whole call.
pub fn rerank<'a>(
    scorer: &dyn RelevanceScorer,
    query: &str,
    candidates: &[Candidate<'a>],
    top_k: usize,
) -> Result<Vec<ScoredCandidate<'a>>, RagError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let passages: Vec<&str> = candidates.iter().map(|c| c.chunk.text.as_str()).collect();
    let scores = scorer
        .score_pairs(query, &passages)
        .map_err(RagError::RerankFailure)?;
    if scores.len() != candidates.len() {
        return Err(RagError::RerankFailure(anyhow!(
            "scorer returned {} scores for {} candidates",
            scores.len(),
            candidates.len()
        )));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(RagError::RerankFailure(anyhow!(
            "scorer returned non-finite score {bad}"
        )));
    }
    let mut scored: Vec<ScoredCandidate<'a>> = candidates
        .iter()
        .zip(scores)
        .map(|(candidate, rerank_score)| ScoredCandidate {
            chunk_id: candidate.chunk_id,
            chunk: candidate.chunk,
            rerank_score,
        })
        .collect();
    scored.sort_by(|a, b| b.rerank_score.total_cmp(&a.rerank_score));
    scored.truncate(top_k);
    debug!(
        candidates = candidates.len(),
        kept = scored.len(),
        best = scored.first().map(|c| c.rerank_score),
        "reranked"
    );
    Ok(scored)
}

/// Offline relevance scorer: share of distinct query terms found in the
/// passage, in [0, 1].
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapScorer;

impl OverlapScorer {
    pub fn coverage(query_terms: &HashSet<String>, passage: &str) -> f32 {
        if query_terms.is_empty() {
            return 0.0;
        }
        let passage_terms: HashSet<String> = tokenize(passage).into_iter().collect();
        let matches = query_terms
            .iter()
            .filter(|term| passage_terms.contains(*term))
            .count();
        matches as f32 / query_terms.len() as f32
    }
}

impl RelevanceScorer for OverlapScorer {
    fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
        Ok(passages
            .iter()
            .map(|passage| Self::coverage(&query_terms, passage))
            .collect())
    }
}
