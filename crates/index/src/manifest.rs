use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::corpus::CorpusStore;
use crate::dense::FlatIndex;
use crate::error::{IndexError, Result};
use crate::lexical::Bm25Index;

pub const META_FILE: &str = "meta.jsonl";
pub const DENSE_FILE: &str = "dense.idx";
pub const LEXICAL_FILE: &str = "lexical.idx";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub chunk_count: usize,
    pub fingerprint: String,
    pub embedder: String,
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
}

/// File locations of one index build.
#[derive(Debug, Clone)]
pub struct IndexLayout {
    dir: PathBuf,
}

impl IndexLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn meta_path(&self) -> PathBuf {
        self.dir.join(META_FILE)
    }

    pub fn dense_path(&self) -> PathBuf {
        self.dir.join(DENSE_FILE)
    }

    pub fn lexical_path(&self) -> PathBuf {
        self.dir.join(LEXICAL_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// True when every artifact file is present.
    pub fn is_complete(&self) -> bool {
        [
            self.meta_path(),
            self.dense_path(),
            self.lexical_path(),
            self.manifest_path(),
        ]
        .iter()
        .all(|path| path.exists())
    }

    pub fn read_manifest(&self) -> Result<IndexManifest> {
        let path = self.manifest_path();
        if !path.exists() {
            return Err(IndexError::Missing(path));
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub manifest: IndexManifest,
    pub corpus: CorpusStore,
    pub dense: FlatIndex,
    pub lexical: Bm25Index,
}

/// Persists all artifacts of one build. Every artifact must already carry the
/// corpus fingerprint.
pub fn write_snapshot(
    layout: &IndexLayout,
    corpus: &CorpusStore,
    dense: &FlatIndex,
    lexical: &Bm25Index,
    embedder: &str,
) -> Result<IndexManifest> {
    let fingerprint = corpus.fingerprint();
    check_consistency(corpus.len(), &fingerprint, dense, lexical)?;
    fs::create_dir_all(layout.dir())?;

    corpus.write_jsonl(&layout.meta_path())?;
    dense.save(&layout.dense_path())?;
    lexical.save(&layout.lexical_path())?;

    let manifest = IndexManifest {
        chunk_count: corpus.len(),
        fingerprint,
        embedder: embedder.to_string(),
        dimensions: dense.dimensions(),
        created_at: Utc::now(),
    };
    fs::write(
        layout.manifest_path(),
        serde_json::to_string_pretty(&manifest)?,
    )?;
    info!(
        dir = %layout.dir().display(),
        chunks = manifest.chunk_count,
        fingerprint = %manifest.fingerprint,
        "index snapshot written"
    );
    Ok(manifest)
}

/// Loads and cross-checks all artifacts. Any count or fingerprint
/// disagreement is a `Mismatch`.
pub fn load_snapshot(layout: &IndexLayout) -> Result<IndexSnapshot> {
    let manifest = layout.read_manifest()?;
    let corpus = CorpusStore::read_jsonl(&layout.meta_path())?;
    let dense = FlatIndex::load(&layout.dense_path())?;
    let lexical = Bm25Index::load(&layout.lexical_path())?;

    if corpus.len() != manifest.chunk_count {
        return Err(IndexError::Mismatch(format!(
            "manifest lists {} chunks but {} has {}",
            manifest.chunk_count,
            META_FILE,
            corpus.len()
        )));
    }
    let fingerprint = corpus.fingerprint();
    if fingerprint != manifest.fingerprint {
        return Err(IndexError::Mismatch(format!(
            "{META_FILE} fingerprint {fingerprint} differs from manifest {}",
            manifest.fingerprint
        )));
    }
    check_consistency(corpus.len(), &fingerprint, &dense, &lexical)?;
    if dense.dimensions() != manifest.dimensions {
        return Err(IndexError::Mismatch(format!(
            "manifest records {} dimensions but {DENSE_FILE} has {}",
            manifest.dimensions,
            dense.dimensions()
        )));
    }
    debug!(chunks = corpus.len(), "index snapshot loaded");
    Ok(IndexSnapshot {
        manifest,
        corpus,
        dense,
        lexical,
    })
}

fn check_consistency(
    chunk_count: usize,
    fingerprint: &str,
    dense: &FlatIndex,
    lexical: &Bm25Index,
) -> Result<()> {
    if dense.len() != chunk_count {
        return Err(IndexError::Mismatch(format!(
            "{DENSE_FILE} has {} rows for {chunk_count} chunks",
            dense.len()
        )));
    }
    if lexical.len() != chunk_count {
        return Err(IndexError::Mismatch(format!(
            "{LEXICAL_FILE} has {} documents for {chunk_count} chunks",
            lexical.len()
        )));
    }
    if dense.fingerprint() != fingerprint {
        return Err(IndexError::Mismatch(format!(
            "{DENSE_FILE} was built from corpus {}",
            dense.fingerprint()
        )));
    }
    if lexical.fingerprint() != fingerprint {
        return Err(IndexError::Mismatch(format!(
            "{LEXICAL_FILE} was built from corpus {}",
            lexical.fingerprint()
        )));
    }
    Ok(())
}
