use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clauselens_core::{HashEmbedder, HashEmbedderConfig};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::collaborators::Embedder;
use crate::config::EmbedderConfig;

#[derive(Clone)]
pub enum EmbeddingBackend {
    Hash {
        embedder: HashEmbedder,
        config: HashEmbedderConfig,
    },
    OpenAi(OpenAiEmbeddingClient),
}

#[derive(Clone)]
pub struct EmbeddingClient {
    backend: EmbeddingBackend,
}

impl EmbeddingClient {
    pub fn from_config(config: &EmbedderConfig, timeout: Duration) -> Result<Self> {
        match config {
            EmbedderConfig::Hash { dimensions, seed } => Ok(Self::hash(HashEmbedderConfig {
                dimensions: *dimensions,
                seed: *seed,
            })),
            EmbedderConfig::OpenAi { model, base_url } => Ok(Self {
                backend: EmbeddingBackend::OpenAi(OpenAiEmbeddingClient::new(
                    model, base_url, timeout,
                )?),
            }),
        }
    }

    pub fn hash(config: HashEmbedderConfig) -> Self {
        Self {
            backend: EmbeddingBackend::Hash {
                embedder: HashEmbedder::new(config),
                config,
            },
        }
    }
}

impl Embedder for EmbeddingClient {
    fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        match &self.backend {
            EmbeddingBackend::Hash { embedder, .. } => Ok(inputs
                .iter()
                .map(|text| embedder.embed_text(text))
                .collect()),
            EmbeddingBackend::OpenAi(client) => client.embed_batch(inputs),
        }
    }

    fn label(&self) -> String {
        match &self.backend {
            EmbeddingBackend::Hash { config, .. } => {
                format!("hash:{}:{}", config.dimensions, config.seed)
            }
            EmbeddingBackend::OpenAi(client) => format!("openai:{}", client.model),
        }
    }
}

#[derive(Clone)]
pub struct OpenAiEmbeddingClient {
    http: Client,
    model: String,
    base_url: String,
    api_key: String,
}

impl OpenAiEmbeddingClient {
    pub fn new(model: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY is required for openai embeddings"))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build embeddings http client")?;
        Ok(Self {
            http,
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/embeddings", self.base_url);
        let payload = serde_json::json!({
            "model": self.model,
            "input": inputs,
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .with_context(|| format!("embeddings request to {url} failed"))?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "openai embeddings request failed: {}",
                response.status()
            ));
        }
        let parsed: OpenAiEmbeddingResponse = response.json()?;
        if parsed.data.len() != inputs.len() {
            return Err(anyhow!(
                "openai returned {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            ));
        }
        let mut data = parsed.data;
        data.sort_by_key(|item| item.index);
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_label_records_shape() {
        let client = EmbeddingClient::hash(HashEmbedderConfig {
            dimensions: 16,
            seed: 9,
        });
        assert_eq!(client.label(), "hash:16:9");
        let vector = client.embed("bid security").unwrap();
        assert_eq!(vector.len(), 16);
    }

    #[test]
    fn batch_keeps_input_order() {
        let client = EmbeddingClient::hash(HashEmbedderConfig::default());
        let inputs = vec!["alpha".to_string(), "beta".to_string()];
        let batch = client.embed_batch(&inputs).unwrap();
        assert_eq!(batch[0], client.embed("alpha").unwrap());
        assert_eq!(batch[1], client.embed("beta").unwrap());
    }
}
