use serde::{Deserialize, Serialize};

use crate::citation::format_citation;
use crate::extract::ExtractedAnswer;
use crate::request::AnswerMode;
use crate::rerank::ScoredCandidate;

pub const ABSTAIN_MESSAGE: &str =
    "I can’t find a clear clause in the indexed documents. Refine the query or ingest more sources.";

pub const ABSTRACTIVE_NOTE: &str =
    "Raw retrieved context. No synthesis was performed; read the cited passages directly.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AskResponse {
    Abstain {
        query: String,
        mode: AnswerMode,
        message: String,
        top_citations: Vec<String>,
    },
    Extractive {
        query: String,
        answer_mode: AnswerMode,
        quotes: Vec<ExtractedAnswer>,
        joined: String,
    },
    Abstractive {
        query: String,
        answer_mode: AnswerMode,
        note: String,
        top_citations: Vec<String>,
        context_preview: String,
    },
}

impl AskResponse {
    pub fn abstain(query: &str, mode: AnswerMode, candidates: &[ScoredCandidate<'_>]) -> Self {
        AskResponse::Abstain {
            query: query.to_string(),
            mode,
            message: ABSTAIN_MESSAGE.to_string(),
            top_citations: citations(candidates),
        }
    }

    pub fn extractive(query: &str, quotes: Vec<ExtractedAnswer>) -> Self {
        let joined = join_quotes(&quotes);
        AskResponse::Extractive {
            query: query.to_string(),
            answer_mode: AnswerMode::Extractive,
            quotes,
            joined,
        }
    }

    pub fn abstractive(
        query: &str,
        candidates: &[ScoredCandidate<'_>],
        preview_chars: usize,
    ) -> Self {
        AskResponse::Abstractive {
            query: query.to_string(),
            answer_mode: AnswerMode::Abstractive,
            note: ABSTRACTIVE_NOTE.to_string(),
            top_citations: citations(candidates),
            context_preview: context_preview(candidates, preview_chars),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            AskResponse::Abstain { .. } => "abstain",
            AskResponse::Extractive { .. } => "extractive",
            AskResponse::Abstractive { .. } => "abstractive",
        }
    }
}

pub fn citations(candidates: &[ScoredCandidate<'_>]) -> Vec<String> {
    candidates.iter().map(|c| format_citation(c.chunk)).collect()
}

/// `"<answer>" [<citation>]` for every quote, joined with `"; "`.
pub fn join_quotes(quotes: &[ExtractedAnswer]) -> String {
    quotes
        .iter()
        .map(|q| format!("\"{}\" [{}]", q.answer, q.citation))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Candidate texts separated by blank lines, cut to `max_chars` characters
/// with a trailing `...` when longer.
pub fn context_preview(candidates: &[ScoredCandidate<'_>], max_chars: usize) -> String {
    let context = candidates
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    match context.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &context[..cut]),
        None => context,
    }
}
