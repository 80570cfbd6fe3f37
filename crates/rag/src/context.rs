use std::sync::Arc;
use std::time::Duration;

use clauselens_core::Chunk;
use clauselens_index::{load_snapshot, CorpusStore, IndexError, IndexLayout, IndexManifest};
use tracing::{info, warn};

use crate::collaborators::{Embedder, LexicalScorer, RelevanceScorer, SpanExtractor, VectorSearch};
use crate::config::{ClauseLensConfig, ExtractorConfig, RerankerConfig};
use crate::embedding::EmbeddingClient;
use crate::error::RagError;
use crate::extract::SentenceExtractor;
use crate::remote::{HttpRelevanceScorer, HttpSpanExtractor};
use crate::rerank::OverlapScorer;

/// Per-request knobs that come from configuration rather than the request.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub top_k_dense: usize,
    pub top_k_lexical: usize,
    pub top_k_reranked: usize,
    pub min_answer_score: f64,
    pub max_answers: usize,
    pub preview_chars: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&ClauseLensConfig::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &ClauseLensConfig) -> Self {
        Self {
            top_k_dense: config.retrieval.top_k_dense,
            top_k_lexical: config.retrieval.top_k_lexical,
            top_k_reranked: config.retrieval.top_k_reranked,
            min_answer_score: config.answer.min_answer_score,
            max_answers: config.answer.max_answers,
            preview_chars: config.answer.preview_chars,
        }
    }
}

/// Corpus plus the two retrieval structures built from it.
pub struct RetrievalIndex {
    corpus: CorpusStore,
    dense: Arc<dyn VectorSearch>,
    lexical: Arc<dyn LexicalScorer>,
    manifest: Option<IndexManifest>,
}

impl RetrievalIndex {
    pub fn new(
        corpus: CorpusStore,
        dense: Arc<dyn VectorSearch>,
        lexical: Arc<dyn LexicalScorer>,
    ) -> Result<Self, RagError> {
        if dense.len() != corpus.len() || lexical.len() != corpus.len() {
            return Err(RagError::Configuration(format!(
                "corpus has {} chunks but dense index has {} and lexical index has {}",
                corpus.len(),
                dense.len(),
                lexical.len()
            )));
        }
        Ok(Self {
            corpus,
            dense,
            lexical,
            manifest: None,
        })
    }

    pub fn corpus(&self) -> &CorpusStore {
        &self.corpus
    }

    pub fn dense(&self) -> &dyn VectorSearch {
        self.dense.as_ref()
    }

    pub fn lexical(&self) -> &dyn LexicalScorer {
        self.lexical.as_ref()
    }

    pub fn manifest(&self) -> Option<&IndexManifest> {
        self.manifest.as_ref()
    }

    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    /// Chunk for a retrieved id. An id past the corpus means the indexes were
    /// built from another snapshot.
    pub fn chunk(&self, id: usize) -> Result<&Chunk, RagError> {
        self.corpus.get(id).ok_or_else(|| {
            RagError::Configuration(format!(
                "retrieved chunk id {id} outside corpus of {}",
                self.corpus.len()
            ))
        })
    }
}

/// Models and scorers consumed by the pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub embedder: Arc<dyn Embedder>,
    pub reranker: Arc<dyn RelevanceScorer>,
    pub extractor: Arc<dyn SpanExtractor>,
}

impl Collaborators {
    pub fn from_config(config: &ClauseLensConfig) -> Result<Self, RagError> {
        let timeout = Duration::from_secs(config.models.timeout_secs);
        let embedder = EmbeddingClient::from_config(&config.models.embedder, timeout)
            .map_err(|err| RagError::Configuration(format!("embedder: {err:#}")))?;
        let reranker: Arc<dyn RelevanceScorer> = match &config.models.reranker {
            RerankerConfig::Overlap => Arc::new(OverlapScorer),
            RerankerConfig::Http { url } => Arc::new(
                HttpRelevanceScorer::new(url, timeout)
                    .map_err(|err| RagError::Configuration(format!("reranker: {err:#}")))?,
            ),
        };
        let extractor: Arc<dyn SpanExtractor> = match &config.models.extractor {
            ExtractorConfig::Sentence => Arc::new(SentenceExtractor),
            ExtractorConfig::Http { url } => Arc::new(
                HttpSpanExtractor::new(url, timeout)
                    .map_err(|err| RagError::Configuration(format!("extractor: {err:#}")))?,
            ),
        };
        Ok(Self {
            embedder: Arc::new(embedder),
            reranker,
            extractor,
        })
    }
}

/// Everything a request needs, built once and shared read-only.
pub struct ServingContext {
    settings: PipelineSettings,
    index: Option<RetrievalIndex>,
    collaborators: Collaborators,
}

impl ServingContext {
    pub fn new(
        settings: PipelineSettings,
        index: Option<RetrievalIndex>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            settings,
            index,
            collaborators,
        }
    }

    /// Builds collaborators and loads the index snapshot. An index directory
    /// without a manifest leaves the context without an index; inconsistent
    /// artifacts or a different embedder are configuration errors.
    pub fn from_config(config: &ClauseLensConfig) -> Result<Self, RagError> {
        config.validate()?;
        let collaborators = Collaborators::from_config(config)?;
        let layout = IndexLayout::new(config.index.dir.clone());
        let index = match load_snapshot(&layout) {
            Ok(snapshot) => {
                let label = collaborators.embedder.label();
                if snapshot.manifest.embedder != label {
                    return Err(RagError::Configuration(format!(
                        "index was built with embedder {} but {} is configured",
                        snapshot.manifest.embedder, label
                    )));
                }
                info!(
                    dir = %layout.dir().display(),
                    chunks = snapshot.manifest.chunk_count,
                    fingerprint = %snapshot.manifest.fingerprint,
                    "index loaded"
                );
                let mut index = RetrievalIndex::new(
                    snapshot.corpus,
                    Arc::new(snapshot.dense),
                    Arc::new(snapshot.lexical),
                )?;
                index.manifest = Some(snapshot.manifest);
                Some(index)
            }
            Err(IndexError::Missing(path)) if path == layout.manifest_path() => {
                warn!(
                    dir = %layout.dir().display(),
                    "no index manifest found; run `clauselens ingest` first"
                );
                None
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self::new(
            PipelineSettings::from_config(config),
            index,
            collaborators,
        ))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn index(&self) -> Option<&RetrievalIndex> {
        self.index.as_ref()
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.collaborators.embedder.as_ref()
    }

    pub fn reranker(&self) -> &dyn RelevanceScorer {
        self.collaborators.reranker.as_ref()
    }

    pub fn extractor(&self) -> &dyn SpanExtractor {
        self.collaborators.extractor.as_ref()
    }

    pub fn chunk_count(&self) -> usize {
        self.index.as_ref().map_or(0, RetrievalIndex::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clauselens_index::{Bm25Index, Bm25Params, FlatIndex};

    #[test]
    fn chunk_outside_corpus_is_configuration_error() {
        let corpus = CorpusStore::new(vec![Chunk {
            text: "only".into(),
            source: "a.pdf".into(),
            page_start: 1,
            page_end: 1,
            section_hint: String::new(),
        }]);
        let dense = FlatIndex::build(vec![vec![1.0]], "fp").unwrap();
        let lexical = Bm25Index::build(["only"], Bm25Params::default(), "fp");
        let index = RetrievalIndex::new(corpus, Arc::new(dense), Arc::new(lexical)).unwrap();
        assert_eq!(index.chunk(0).unwrap().text, "only");
        let err = index.chunk(5).unwrap_err();
        assert_eq!(err.code(), "configuration_error");
    }

    #[test]
    fn default_settings_match_config_defaults() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.top_k_dense, 12);
        assert_eq!(settings.top_k_reranked, 6);
        assert_eq!(settings.max_answers, 3);
    }
}
