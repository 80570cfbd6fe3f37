use tracing::{debug, info, info_span};

use crate::context::ServingContext;
use crate::error::RagError;
use crate::extract::AnswerSelector;
use crate::request::{AnswerMode, AskRequest, RawAskRequest};
use crate::rerank::{rerank, Candidate};
use crate::response::AskResponse;
use crate::retrieval::{dense_candidates, fuse_candidates, lexical_candidates};

/// Validates a wire request against the context defaults, then answers it.
pub fn answer(ctx: &ServingContext, raw: RawAskRequest) -> Result<AskResponse, RagError> {
    let request = raw.validate(ctx.settings().top_k_reranked)?;
    ask(ctx, &request)
}

/// Runs retrieval, fusion, reranking and answer selection for one request.
pub fn ask(ctx: &ServingContext, request: &AskRequest) -> Result<AskResponse, RagError> {
    let span = info_span!("ask", mode = %request.mode(), top_k = request.top_k());
    let _guard = span.enter();

    let index = match ctx.index() {
        Some(index) if !index.is_empty() => index,
        Some(_) => return Err(RagError::IndexUnavailable("the corpus is empty".into())),
        None => {
            return Err(RagError::IndexUnavailable(
                "no index loaded; ingest documents first".into(),
            ))
        }
    };
    let settings = ctx.settings();
    let query = request.query();

    let dense = dense_candidates(ctx.embedder(), index.dense(), query, settings.top_k_dense)?;
    let lexical = lexical_candidates(index.lexical(), query, settings.top_k_lexical)?;
    let fused = fuse_candidates(&dense, &lexical);
    let candidates = fused
        .iter()
        .map(|&chunk_id| {
            index
                .chunk(chunk_id)
                .map(|chunk| Candidate { chunk_id, chunk })
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        dense = dense.len(),
        lexical = lexical.len(),
        fused = candidates.len(),
        "candidates fused"
    );

    let reranked = rerank(ctx.reranker(), query, &candidates, request.top_k())?;

    let response = match request.mode() {
        AnswerMode::Abstractive => {
            AskResponse::abstractive(query, &reranked, settings.preview_chars)
        }
        AnswerMode::Extractive => {
            let selector = AnswerSelector::new(settings.min_answer_score, settings.max_answers);
            let answers = selector.select(ctx.extractor(), query, &reranked)?;
            if answers.is_empty() {
                AskResponse::abstain(query, request.mode(), &reranked)
            } else {
                AskResponse::extractive(query, answers)
            }
        }
    };
    info!(status = response.status(), reranked = reranked.len(), "answered");
    Ok(response)
}
