mod chunk;
mod embedding;
mod error;
mod ingest;
mod normalization;

pub use chunk::{Chunk, ChunkConfig, ChunkId, Chunker};
pub use embedding::{normalize, HashEmbedder, HashEmbedderConfig};
pub use error::{CoreError, Result};
pub use ingest::{extract_document_chunks, ingest_directory, scan_directory, SourceFormat};
pub use normalization::{clean_text, tokenize};
