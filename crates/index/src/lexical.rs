use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use clauselens_core::tokenize;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
    pub epsilon: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

/// Okapi BM25 over tokenized chunk texts. Terms whose idf would be negative
/// (present in more than half the corpus) get `epsilon * mean_idf` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bm25Index {
    params: Bm25Params,
    doc_lengths: Vec<u32>,
    avg_doc_len: f32,
    term_freqs: Vec<HashMap<String, u32>>,
    idf: HashMap<String, f32>,
    fingerprint: String,
}

impl Bm25Index {
    pub fn build<'a, I>(texts: I, params: Bm25Params, fingerprint: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut doc_lengths = Vec::new();
        let mut term_freqs = Vec::new();
        let mut doc_freq: HashMap<String, u32> = HashMap::new();
        for text in texts {
            let tokens = tokenize(text);
            doc_lengths.push(tokens.len() as u32);
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(freqs);
        }

        let total_docs = doc_lengths.len() as f32;
        let avg_doc_len = if doc_lengths.is_empty() {
            0.0
        } else {
            doc_lengths.iter().map(|&len| len as f32).sum::<f32>() / total_docs
        };

        let mut idf = HashMap::with_capacity(doc_freq.len());
        let mut idf_sum = 0.0f32;
        let mut negative = Vec::new();
        for (term, df) in doc_freq {
            let df = df as f32;
            let value = (total_docs - df + 0.5).ln() - (df + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }
        if !idf.is_empty() {
            let floor = params.epsilon * (idf_sum / idf.len() as f32);
            for term in negative {
                idf.insert(term, floor);
            }
        }

        Self {
            params,
            doc_lengths,
            avg_doc_len,
            term_freqs,
            idf,
            fingerprint: fingerprint.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// One score per chunk id, in corpus order. Unknown terms contribute zero.
    pub fn scores(&self, query_tokens: &[String]) -> Vec<f32> {
        let Bm25Params { k1, b, .. } = self.params;
        let avg = self.avg_doc_len.max(1e-3);
        self.term_freqs
            .iter()
            .zip(&self.doc_lengths)
            .map(|(freqs, &len)| {
                let norm = k1 * (1.0 - b + b * (len as f32 / avg));
                query_tokens
                    .iter()
                    .filter_map(|token| {
                        let tf = *freqs.get(token)? as f32;
                        let idf = self.idf.get(token).copied().unwrap_or(0.0);
                        Some(idf * (tf * (k1 + 1.0)) / (tf + norm))
                    })
                    .sum()
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut file, self)?;
        file.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IndexError::Missing(path.to_path_buf()));
        }
        let mut file = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(&mut file)?)
    }
}
