use clauselens_core::{tokenize, ChunkId};
use tracing::debug;

use crate::collaborators::{top_k_by_score, Embedder, LexicalScorer, VectorSearch};
use crate::error::RagError;

/// Embeds the query and returns the ids of the `k` nearest chunks.
pub fn dense_candidates(
    embedder: &dyn Embedder,
    index: &dyn VectorSearch,
    query: &str,
    k: usize,
) -> Result<Vec<ChunkId>, RagError> {
    let vector = embedder.embed(query).map_err(RagError::RetrievalFailure)?;
    let hits = index
        .search(&vector, k)
        .map_err(RagError::RetrievalFailure)?;
    debug!(hits = hits.len(), "dense retrieval");
    Ok(hits.into_iter().map(|(id, _)| id).collect())
}

/// Scores every chunk lexically and returns the ids of the `k` best.
pub fn lexical_candidates(
    scorer: &dyn LexicalScorer,
    query: &str,
    k: usize,
) -> Result<Vec<ChunkId>, RagError> {
    let tokens = tokenize(query);
    let scores = scorer
        .scores(&tokens)
        .map_err(RagError::RetrievalFailure)?;
    if scores.len() != scorer.len() {
        return Err(RagError::Configuration(format!(
            "lexical scorer returned {} scores for {} chunks",
            scores.len(),
            scorer.len()
        )));
    }
    let ids = top_k_by_score(&scores, k);
    debug!(tokens = tokens.len(), hits = ids.len(), "lexical retrieval");
    Ok(ids)
}

/// Merges both rankings: dense ids first, then lexical ids not yet seen.
/// Nothing is re-scored.
pub fn fuse_candidates(dense: &[ChunkId], lexical: &[ChunkId]) -> Vec<ChunkId> {
    let mut seen = std::collections::HashSet::with_capacity(dense.len() + lexical.len());
    dense
        .iter()
        .chain(lexical)
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed_batch(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(anyhow!("model offline"))
        }

        fn label(&self) -> String {
            "failing".into()
        }
    }

    struct ShortScorer;

    impl LexicalScorer for ShortScorer {
        fn scores(&self, _tokens: &[String]) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }

        fn len(&self) -> usize {
            3
        }
    }

    #[test]
    fn fusion_keeps_dense_order_then_new_lexical_ids() {
        assert_eq!(fuse_candidates(&[4, 1, 7], &[1, 9, 4, 2]), vec![4, 1, 7, 9, 2]);
        assert_eq!(fuse_candidates(&[], &[3, 3]), vec![3]);
        assert!(fuse_candidates(&[], &[]).is_empty());
    }

    #[test]
    fn embedder_failure_is_retrieval_failure() {
        let index = clauselens_index::FlatIndex::build(vec![vec![1.0]], "fp").unwrap();
        let err = dense_candidates(&FailingEmbedder, &index, "q", 3).unwrap_err();
        assert_eq!(err.code(), "retrieval_failure");
    }

    #[test]
    fn short_score_vector_is_configuration_error() {
        let err = lexical_candidates(&ShortScorer, "q", 3).unwrap_err();
        assert_eq!(err.code(), "configuration_error");
    }
}
