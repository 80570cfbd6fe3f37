use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clauselens_core::{ChunkConfig, HashEmbedderConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RagError;

pub const CONFIG_ENV: &str = "CLAUSELENS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "clauselens.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClauseLensConfig {
    #[serde(default)]
    pub index: IndexSection,
    #[serde(default)]
    pub retrieval: RetrievalSection,
    #[serde(default)]
    pub answer: AnswerSection,
    #[serde(default)]
    pub models: ModelsSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSection {
    #[serde(default = "default_index_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl IndexSection {
    pub fn chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            chunk_size: self.chunk_size,
            overlap: self.overlap,
        }
    }
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("index")
}

fn default_chunk_size() -> usize {
    ChunkConfig::default().chunk_size
}

fn default_overlap() -> usize {
    ChunkConfig::default().overlap
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSection {
    #[serde(default = "default_candidates")]
    pub top_k_dense: usize,
    #[serde(default = "default_candidates")]
    pub top_k_lexical: usize,
    #[serde(default = "default_top_k_reranked")]
    pub top_k_reranked: usize,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k_dense: default_candidates(),
            top_k_lexical: default_candidates(),
            top_k_reranked: default_top_k_reranked(),
        }
    }
}

fn default_candidates() -> usize {
    12
}

fn default_top_k_reranked() -> usize {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSection {
    #[serde(default = "default_min_answer_score")]
    pub min_answer_score: f64,
    #[serde(default = "default_max_answers")]
    pub max_answers: usize,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for AnswerSection {
    fn default() -> Self {
        Self {
            min_answer_score: default_min_answer_score(),
            max_answers: default_max_answers(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_min_answer_score() -> f64 {
    0.5
}

fn default_max_answers() -> usize {
    3
}

fn default_preview_chars() -> usize {
    1200
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsSection {
    #[serde(default)]
    pub embedder: EmbedderConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum EmbedderConfig {
    Hash {
        #[serde(default = "default_hash_dimensions")]
        dimensions: usize,
        #[serde(default = "default_hash_seed")]
        seed: u64,
    },
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default = "default_openai_url")]
        base_url: String,
    },
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        EmbedderConfig::Hash {
            dimensions: default_hash_dimensions(),
            seed: default_hash_seed(),
        }
    }
}

fn default_hash_dimensions() -> usize {
    HashEmbedderConfig::default().dimensions
}

fn default_hash_seed() -> u64 {
    HashEmbedderConfig::default().seed
}

fn default_openai_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum RerankerConfig {
    #[default]
    Overlap,
    Http { url: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ExtractorConfig {
    #[default]
    Sentence,
    Http { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl ClauseLensConfig {
    /// Reads `path`, or `$CLAUSELENS_CONFIG`, or `./clauselens.toml`. A missing
    /// file yields defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, RagError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        };
        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|err| {
                RagError::Configuration(format!("failed to read {}: {err}", path.display()))
            })?;
            Self::from_toml(&raw)?
        } else {
            debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, RagError> {
        toml::from_str(raw).map_err(|err| RagError::Configuration(format!("invalid config: {err}")))
    }

    fn apply_env_overrides(&mut self) -> Result<(), RagError> {
        if let Some(dir) = env::var_os("CLAUSELENS_INDEX_DIR") {
            self.index.dir = PathBuf::from(dir);
        }
        if let Ok(addr) = env::var("CLAUSELENS_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Ok(raw) = env::var("CLAUSELENS_MIN_ANSWER_SCORE") {
            self.answer.min_answer_score = raw.trim().parse().map_err(|_| {
                RagError::Configuration(format!(
                    "CLAUSELENS_MIN_ANSWER_SCORE is not a number: {raw}"
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), RagError> {
        let bad = |msg: &str| Err(RagError::Configuration(msg.to_string()));
        if self.retrieval.top_k_dense == 0 || self.retrieval.top_k_lexical == 0 {
            return bad("retrieval.top_k_dense and retrieval.top_k_lexical must be at least 1");
        }
        if self.retrieval.top_k_reranked == 0 {
            return bad("retrieval.top_k_reranked must be at least 1");
        }
        if !self.answer.min_answer_score.is_finite() {
            return bad("answer.min_answer_score must be finite");
        }
        if self.answer.max_answers == 0 {
            return bad("answer.max_answers must be at least 1");
        }
        if self.index.chunk_size == 0 || self.index.overlap >= self.index.chunk_size {
            return bad("index.overlap must be smaller than a positive index.chunk_size");
        }
        Ok(())
    }
}
