use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::collaborators::{ExtractedSpan, RelevanceScorer, SpanExtractor};

fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build http client")
}

/// Cross-encoder served behind a text-embeddings-inference style
/// `POST /rerank` endpoint.
#[derive(Clone)]
pub struct HttpRelevanceScorer {
    http: Client,
    url: String,
}

impl HttpRelevanceScorer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            url: format!("{}/rerank", base_url.trim_end_matches('/')),
        })
    }
}

#[derive(Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

impl RelevanceScorer for HttpRelevanceScorer {
    fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }
        let payload = serde_json::json!({
            "query": query,
            "texts": passages,
            "raw_scores": false,
        });
        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .with_context(|| format!("rerank request to {} failed", self.url))?;
        if !response.status().is_success() {
            return Err(anyhow!("rerank request failed: {}", response.status()));
        }
        let hits: Vec<RerankHit> = response.json()?;
        let mut scores = vec![None; passages.len()];
        for hit in hits {
            let slot = scores
                .get_mut(hit.index)
                .ok_or_else(|| anyhow!("rerank hit index {} out of range", hit.index))?;
            *slot = Some(hit.score);
        }
        scores
            .into_iter()
            .enumerate()
            .map(|(idx, score)| score.ok_or_else(|| anyhow!("no rerank score for passage {idx}")))
            .collect()
    }
}

/// Extractive question-answering model served behind a Hugging Face style
/// inference endpoint.
#[derive(Clone)]
pub struct HttpSpanExtractor {
    http: Client,
    url: String,
}

impl HttpSpanExtractor {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            url: url.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct QaResponse {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    score: f64,
}

/// Pipelines answer either with a single object or with a ranked list.
#[derive(Deserialize)]
#[serde(untagged)]
enum QaReply {
    Many(Vec<QaResponse>),
    One(QaResponse),
}

impl QaReply {
    fn into_best(self) -> Option<QaResponse> {
        match self {
            QaReply::Many(list) => list.into_iter().next(),
            QaReply::One(parsed) => Some(parsed),
        }
    }
}

impl SpanExtractor for HttpSpanExtractor {
    fn extract(&self, question: &str, context: &str) -> Result<Option<ExtractedSpan>> {
        let payload = serde_json::json!({
            "inputs": { "question": question, "context": context },
        });
        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .with_context(|| format!("qa request to {} failed", self.url))?;
        if !response.status().is_success() {
            return Err(anyhow!("qa request failed: {}", response.status()));
        }
        let reply: QaReply = response.json()?;
        Ok(parse_qa(reply))
    }
}

fn parse_qa(reply: QaReply) -> Option<ExtractedSpan> {
    let parsed = reply.into_best()?;
    if parsed.answer.trim().is_empty() {
        return None;
    }
    Some(ExtractedSpan {
        answer: parsed.answer,
        score: parsed.score,
    })
}
