use std::collections::HashSet;

use anyhow::Result;
use clauselens_core::Chunk;
use clauselens_rag::{
    fuse_candidates, rerank, top_k_by_score, AnswerSelector, Candidate, ExtractedAnswer,
    RelevanceScorer,
};
use proptest::prelude::*;

struct FixedScorer(Vec<f32>);

impl RelevanceScorer for FixedScorer {
    fn score_pairs(&self, _query: &str, _passages: &[&str]) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

fn corpus(n: usize) -> Vec<Chunk> {
    (0..n)
        .map(|i| Chunk {
            text: format!("chunk {i}"),
            source: "doc.pdf".into(),
            page_start: 1,
            page_end: 1,
            section_hint: String::new(),
        })
        .collect()
}

proptest! {
    #[test]
    fn fusion_yields_each_id_once_dense_first(
        dense in prop::collection::vec(0usize..40, 0..12),
        lexical in prop::collection::vec(0usize..40, 0..12),
    ) {
        let fused = fuse_candidates(&dense, &lexical);
        let unique: HashSet<usize> = fused.iter().copied().collect();
        prop_assert_eq!(unique.len(), fused.len());
        let expected: HashSet<usize> = dense.iter().chain(&lexical).copied().collect();
        prop_assert_eq!(&unique, &expected);

        let dense_set: HashSet<usize> = dense.iter().copied().collect();
        let dense_count = fused.iter().take_while(|id| dense_set.contains(id)).count();
        prop_assert_eq!(dense_count, dense_set.len());
    }

    #[test]
    fn rerank_is_bounded_sorted_and_from_input(
        scores in prop::collection::vec(-5.0f32..5.0, 1..24),
        top_k in 1usize..10,
    ) {
        let chunks = corpus(scores.len());
        let candidates: Vec<Candidate<'_>> = chunks
            .iter()
            .enumerate()
            .map(|(chunk_id, chunk)| Candidate { chunk_id, chunk })
            .collect();
        let ranked = rerank(&FixedScorer(scores.clone()), "q", &candidates, top_k).unwrap();
        prop_assert!(ranked.len() <= top_k);
        prop_assert_eq!(ranked.len(), top_k.min(scores.len()));
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].rerank_score >= pair[1].rerank_score);
            if pair[0].rerank_score == pair[1].rerank_score {
                prop_assert!(pair[0].chunk_id < pair[1].chunk_id);
            }
        }
        for scored in &ranked {
            prop_assert_eq!(scored.rerank_score, scores[scored.chunk_id]);
            prop_assert_eq!(&scored.chunk.text, &chunks[scored.chunk_id].text);
        }
    }

    #[test]
    fn selection_respects_floor_and_dedup(
        raw in prop::collection::vec((0usize..5, 0.0f64..1.0), 0..20),
        floor in 0.0f64..1.0,
    ) {
        let answers: Vec<ExtractedAnswer> = raw
            .iter()
            .map(|(key, score)| ExtractedAnswer {
                answer: format!("answer {key}"),
                score: *score,
                citation: String::new(),
            })
            .collect();
        let selected = AnswerSelector::new(floor, 3).collect(answers);
        prop_assert!(selected.len() <= 3);
        let texts: HashSet<&str> = selected.iter().map(|a| a.answer.as_str()).collect();
        prop_assert_eq!(texts.len(), selected.len());
        for answer in &selected {
            prop_assert!(answer.score >= floor);
            let best = raw
                .iter()
                .filter(|(key, _)| format!("answer {key}") == answer.answer)
                .map(|(_, score)| *score)
                .fold(f64::MIN, f64::max);
            prop_assert_eq!(answer.score, best);
        }
        for pair in selected.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn top_k_by_score_is_sorted_prefix(
        scores in prop::collection::vec(0.0f32..10.0, 0..30),
        k in 0usize..40,
    ) {
        let ids = top_k_by_score(&scores, k);
        prop_assert_eq!(ids.len(), k.min(scores.len()));
        for pair in ids.windows(2) {
            prop_assert!(scores[pair[0]] >= scores[pair[1]]);
        }
    }
}
