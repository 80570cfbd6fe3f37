use std::path::Path;

use anyhow::{Context, Result};
use clauselens_core::{ingest_directory, Chunk, ChunkConfig, Chunker};
use clauselens_index::{
    write_snapshot, Bm25Index, Bm25Params, CorpusStore, FlatIndex, IndexLayout, IndexManifest,
};
use clauselens_rag::Embedder;
use rayon::prelude::*;
use tracing::info;

const EMBED_BATCH: usize = 64;

/// Chunks every supported file under `data_dir`, embeds the chunks and writes
/// a complete index snapshot to `layout`.
pub fn build_index(
    data_dir: &Path,
    layout: &IndexLayout,
    chunk_config: ChunkConfig,
    embedder: &dyn Embedder,
) -> Result<IndexManifest> {
    let chunker = Chunker::new(chunk_config)?;
    let chunks = ingest_directory(data_dir, &chunker)
        .with_context(|| format!("failed to ingest {}", data_dir.display()))?;
    let config = chunker.config();
    info!(
        chunks = chunks.len(),
        chunk_size = config.chunk_size,
        overlap = config.overlap,
        "corpus chunked"
    );

    let vectors = embed_chunks(&chunks, embedder)?;
    let corpus = CorpusStore::new(chunks);
    let fingerprint = corpus.fingerprint();
    let dense = FlatIndex::build(vectors, fingerprint.clone())?;
    let lexical = Bm25Index::build(
        corpus.chunks().iter().map(|chunk| chunk.text.as_str()),
        Bm25Params::default(),
        fingerprint,
    );
    let params = lexical.params();
    info!(k1 = params.k1, b = params.b, epsilon = params.epsilon, "lexical index built");
    let manifest = write_snapshot(layout, &corpus, &dense, &lexical, &embedder.label())
        .with_context(|| format!("failed to write index to {}", layout.dir().display()))?;
    Ok(manifest)
}

fn embed_chunks(chunks: &[Chunk], embedder: &dyn Embedder) -> Result<Vec<Vec<f32>>> {
    let batches = chunks
        .par_chunks(EMBED_BATCH)
        .map(|batch| {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let vectors = embedder.embed_batch(&texts)?;
            anyhow::ensure!(
                vectors.len() == texts.len(),
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                texts.len()
            );
            Ok(vectors)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(batches.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clauselens_core::HashEmbedderConfig;
    use clauselens_index::load_snapshot;
    use clauselens_rag::EmbeddingClient;
    use std::fs;

    #[test]
    fn builds_loadable_snapshot_from_text_files() {
        let data = tempfile::tempdir().unwrap();
        fs::write(
            data.path().join("rfp.txt"),
            "BID SECURITY\nThe bid security is $50,000.\u{c}PAYMENT\nNet thirty days.",
        )
        .unwrap();
        fs::write(data.path().join("terms.md"), "Insurance must be maintained.").unwrap();
        let out = tempfile::tempdir().unwrap();
        let layout = IndexLayout::new(out.path().join("index"));
        let embedder = EmbeddingClient::hash(HashEmbedderConfig {
            dimensions: 32,
            seed: 1,
        });

        let manifest =
            build_index(data.path(), &layout, ChunkConfig::default(), &embedder).unwrap();
        assert_eq!(manifest.chunk_count, 3);
        assert_eq!(manifest.embedder, "hash:32:1");

        let snapshot = load_snapshot(&layout).unwrap();
        assert_eq!(snapshot.corpus.chunks()[0].source, "rfp.txt");
        assert_eq!(snapshot.corpus.chunks()[1].page_start, 2);
        assert_eq!(snapshot.corpus.chunks()[2].source, "terms.md");
    }

    #[test]
    fn empty_data_dir_fails() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let embedder = EmbeddingClient::hash(HashEmbedderConfig::default());
        let result = build_index(
            data.path(),
            &IndexLayout::new(out.path()),
            ChunkConfig::default(),
            &embedder,
        );
        assert!(result.is_err());
    }
}
