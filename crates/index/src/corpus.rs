use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use clauselens_core::{Chunk, ChunkId};
use sha2::{Digest, Sha256};

use crate::error::{IndexError, Result};
use crate::jsonl::{read_jsonl, JsonlWriter};

/// Ordered chunk records. A chunk id is its position here.
#[derive(Debug, Clone, Default)]
pub struct CorpusStore {
    chunks: Vec<Chunk>,
}

impl CorpusStore {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// SHA-256 over the ordered chunk texts and sources, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for chunk in &self.chunks {
            hasher.update(chunk.text.as_bytes());
            hasher.update([0u8]);
            hasher.update(chunk.source.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    pub fn write_jsonl(&self, path: &Path) -> Result<usize> {
        let mut writer = JsonlWriter::new(BufWriter::new(File::create(path)?));
        for chunk in &self.chunks {
            writer.write_record(chunk)?;
        }
        let written = writer.written();
        writer.into_inner()?;
        Ok(written)
    }

    pub fn read_jsonl(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IndexError::Missing(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(Self::new(read_jsonl(reader)?))
    }
}
