use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::chunk::{Chunk, Chunker};
use crate::error::{CoreError, Result};

const FORM_FEED: char = '\u{c}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Text,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_lowercase());
        match ext.as_deref() {
            Some("pdf") => Some(SourceFormat::Pdf),
            Some("txt") | Some("md") => Some(SourceFormat::Text),
            _ => None,
        }
    }
}

/// Top-level files of `dir` with a supported extension, sorted by name so
/// chunk order is reproducible across builds.
pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if SourceFormat::from_path(path).is_none() {
            debug!(path = %path.display(), "skipping unsupported file");
            continue;
        }
        files.push(path.to_path_buf());
    }
    Ok(files)
}

pub fn extract_document_chunks(path: &Path, chunker: &Chunker) -> Result<Vec<Chunk>> {
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let pages = read_pages(path)?;
    let mut chunks = Vec::new();
    for (idx, page) in pages.iter().enumerate() {
        chunks.extend(chunker.chunk_page(&source, idx as u32 + 1, page));
    }
    debug!(
        source = %source,
        pages = pages.len(),
        chunks = chunks.len(),
        "extracted document"
    );
    Ok(chunks)
}

/// Chunks every supported file in `dir`, in file-name order.
pub fn ingest_directory(dir: &Path, chunker: &Chunker) -> Result<Vec<Chunk>> {
    let files = scan_directory(dir)?;
    let mut corpus = Vec::new();
    for path in &files {
        match extract_document_chunks(path, chunker) {
            Ok(chunks) => {
                info!(path = %path.display(), chunks = chunks.len(), "ingested");
                corpus.extend(chunks);
            }
            Err(CoreError::Pdf { path, message }) => {
                warn!(path = %path.display(), error = %message, "skipping unreadable pdf");
            }
            Err(err) => return Err(err),
        }
    }
    if corpus.is_empty() {
        return Err(CoreError::EmptyCorpus(dir.to_path_buf()));
    }
    Ok(corpus)
}

fn read_pages(path: &Path) -> Result<Vec<String>> {
    match SourceFormat::from_path(path) {
        Some(SourceFormat::Pdf) => {
            pdf_extract::extract_text_by_pages(path).map_err(|e| CoreError::Pdf {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
        Some(SourceFormat::Text) => {
            let bytes = fs::read(path)?;
            let text = String::from_utf8_lossy(&bytes);
            Ok(text.split(FORM_FEED).map(str::to_string).collect())
        }
        None => Err(CoreError::UnsupportedInput(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkConfig;
    use tempfile::tempdir;

    #[test]
    fn text_files_split_pages_on_form_feed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("terms.txt");
        fs::write(&path, "First page clause.\u{c}Second page clause.").unwrap();
        let chunker = Chunker::new(ChunkConfig::default()).unwrap();
        let chunks = extract_document_chunks(&path, &chunker).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source, "terms.txt");
        assert_eq!(chunks[1].page_start, 2);
        assert_eq!(chunks[1].text, "Second page clause.");
    }

    #[test]
    fn scan_is_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("image.png"), "x").unwrap();
        fs::create_dir(dir.path().join("nested.txt")).unwrap();
        let files = scan_directory(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.md", "b.txt"]);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let chunker = Chunker::new(ChunkConfig::default()).unwrap();
        let err = ingest_directory(dir.path(), &chunker).unwrap_err();
        assert!(matches!(err, CoreError::EmptyCorpus(_)));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.docx");
        fs::write(&path, "x").unwrap();
        let chunker = Chunker::new(ChunkConfig::default()).unwrap();
        assert!(matches!(
            extract_document_chunks(&path, &chunker),
            Err(CoreError::UnsupportedInput(_))
        ));
    }
}
