use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use clauselens_core::{normalize, ChunkId};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Exhaustive inner-product index over L2-normalized vectors; row `i` is the
/// embedding of chunk `i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
    fingerprint: String,
}

impl FlatIndex {
    pub fn build(vectors: Vec<Vec<f32>>, fingerprint: impl Into<String>) -> Result<Self> {
        let dimensions = vectors.first().map(Vec::len).ok_or(IndexError::EmptyCorpus)?;
        let mut normalized = Vec::with_capacity(vectors.len());
        for mut vector in vectors {
            if vector.len() != dimensions {
                return Err(IndexError::Dimensions {
                    expected: dimensions,
                    actual: vector.len(),
                });
            }
            normalize(&mut vector);
            normalized.push(vector);
        }
        Ok(Self {
            dimensions,
            vectors: normalized,
            fingerprint: fingerprint.into(),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Top `k` rows by inner product with the normalized query; ties go to the
    /// lower id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(ChunkId, f32)>> {
        if query.len() != self.dimensions {
            return Err(IndexError::Dimensions {
                expected: self.dimensions,
                actual: query.len(),
            });
        }
        let mut query = query.to_vec();
        normalize(&mut query);
        let mut hits: Vec<(ChunkId, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, row)| (id, dot(row, &query)))
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        hits.truncate(k);
        Ok(hits)
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

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_ranks_by_inner_product() {
        let index = FlatIndex::build(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            "fp",
        )
        .unwrap();
        let hits = index.search(&[1.0, 0.1], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 2);
        assert!(hits[0].1 >= hits[1].1);
    }

    #[test]
    fn k_larger_than_index_returns_everything() {
        let index = FlatIndex::build(vec![vec![1.0, 0.0], vec![0.0, 1.0]], "fp").unwrap();
        assert_eq!(index.search(&[0.5, 0.5], 10).unwrap().len(), 2);
    }

    #[test]
    fn ties_prefer_lower_ids() {
        let index = FlatIndex::build(vec![vec![0.0, 1.0], vec![0.0, 1.0]], "fp").unwrap();
        let hits = index.search(&[0.0, 1.0], 2).unwrap();
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 1);
    }

    #[test]
    fn rejects_ragged_and_empty_input() {
        assert!(matches!(
            FlatIndex::build(vec![vec![1.0], vec![1.0, 2.0]], "fp"),
            Err(IndexError::Dimensions { expected: 1, actual: 2 })
        ));
        assert!(matches!(
            FlatIndex::build(Vec::new(), "fp"),
            Err(IndexError::EmptyCorpus)
        ));
    }

    #[test]
    fn query_dimension_is_checked() {
        let index = FlatIndex::build(vec![vec![1.0, 0.0]], "fp").unwrap();
        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn save_and_load_preserve_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dense.idx");
        let index = FlatIndex::build(vec![vec![3.0, 4.0]], "abc").unwrap();
        index.save(&path).unwrap();
        let loaded = FlatIndex::load(&path).unwrap();
        assert_eq!(loaded.fingerprint(), "abc");
        assert_eq!(loaded.dimensions(), 2);
        let hits = loaded.search(&[3.0, 4.0], 1).unwrap();
        assert!((hits[0].1 - 1.0).abs() < 1e-5);
    }
}
