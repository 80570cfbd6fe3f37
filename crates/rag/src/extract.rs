use std::collections::HashSet;

use anyhow::Result;
use clauselens_core::tokenize;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::citation::format_citation;
use crate::collaborators::{ExtractedSpan, SpanExtractor};
use crate::error::RagError;
use crate::rerank::{OverlapScorer, ScoredCandidate};

static SENTENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?\n]+[.!?]*").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedAnswer {
    pub answer: String,
    pub score: f64,
    pub citation: String,
}

/// Confidence floor, dedup and ranking over extracted spans.
#[derive(Debug, Clone, Copy)]
pub struct AnswerSelector {
    min_score: f64,
    max_answers: usize,
}

impl AnswerSelector {
    pub fn new(min_score: f64, max_answers: usize) -> Self {
        Self {
            min_score,
            max_answers,
        }
    }

    /// Runs the extractor over every candidate in rank order and keeps the
    /// confident answers.
    pub fn select(
        &self,
        extractor: &dyn SpanExtractor,
        query: &str,
        candidates: &[ScoredCandidate<'_>],
    ) -> Result<Vec<ExtractedAnswer>, RagError> {
        let mut found = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let span = extractor
                .extract(query, &candidate.chunk.text)
                .map_err(RagError::ExtractionFailure)?;
            if let Some(span) = span {
                found.push(ExtractedAnswer {
                    answer: span.answer,
                    score: span.score,
                    citation: format_citation(candidate.chunk),
                });
            }
        }
        let selected = self.collect(found);
        debug!(
            candidates = candidates.len(),
            answers = selected.len(),
            "answer selection"
        );
        Ok(selected)
    }

    /// Drops empty and sub-threshold answers (the floor is inclusive) and
    /// keeps the best-scoring copy per trimmed text, then ranks. Kept answers
    /// carry their text exactly as extracted.
    pub fn collect(&self, answers: impl IntoIterator<Item = ExtractedAnswer>) -> Vec<ExtractedAnswer> {
        let mut best: IndexMap<String, ExtractedAnswer> = IndexMap::new();
        for answer in answers {
            let key = answer.answer.trim();
            if key.is_empty() || answer.score.is_nan() || answer.score < self.min_score {
                continue;
            }
            match best.get_mut(key) {
                Some(existing) if answer.score > existing.score => *existing = answer,
                Some(_) => {}
                None => {
                    best.insert(key.to_string(), answer);
                }
            }
        }
        let mut ranked: Vec<ExtractedAnswer> = best.into_values().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(self.max_answers);
        ranked
    }
}

/// Offline extractor: the sentence covering the most query terms, with that
/// coverage as confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceExtractor;

impl SpanExtractor for SentenceExtractor {
    fn extract(&self, question: &str, context: &str) -> Result<Option<ExtractedSpan>> {
        let query_terms: HashSet<String> = tokenize(question).into_iter().collect();
        let mut best: Option<ExtractedSpan> = None;
        for sentence in SENTENCE.find_iter(context) {
            let text = sentence.as_str().trim();
            if text.is_empty() {
                continue;
            }
            let score = f64::from(OverlapScorer::coverage(&query_terms, text));
            if score > 0.0 && best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(ExtractedSpan {
                    answer: text.to_string(),
                    score,
                });
            }
        }
        Ok(best)
    }
}
