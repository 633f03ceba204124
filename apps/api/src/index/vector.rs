//! Flat inner-product vector index.
//!
//! Vectors are stored row-major in one contiguous buffer and searched exhaustively,
//! so results are exact. With unit vectors the inner product is the cosine similarity.

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::index::{write_atomic, IndexError};

const MAGIC: [u8; 4] = *b"RVEC";
const FORMAT_VERSION: u32 = 1;

/// On-disk layout of one `index.<generation>.vec` file.
#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    magic: [u8; 4],
    version: u32,
    dimension: usize,
    generation: u64,
    vectors: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
    /// Stamp of the flush that produced (or will produce) the file.
    generation: u64,
}

impl FlatIndex {
    pub fn create_empty(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
            generation: 0,
        }
    }

    /// Loads a persisted index. Missing file is `StorageNotFound`.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexError::StorageNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let persisted: PersistedIndex = bincode::deserialize(&bytes)?;

        if persisted.magic != MAGIC {
            return Err(IndexError::CorruptStore(format!(
                "{} is not a vector index file",
                path.display()
            )));
        }
        if persisted.version != FORMAT_VERSION {
            return Err(IndexError::CorruptStore(format!(
                "unsupported vector index format version {}",
                persisted.version
            )));
        }
        if persisted.dimension == 0 || persisted.vectors.len() % persisted.dimension != 0 {
            return Err(IndexError::CorruptStore(format!(
                "vector buffer of {} floats does not divide into rows of {}",
                persisted.vectors.len(),
                persisted.dimension
            )));
        }

        debug!(
            "Loaded vector index from {} ({} vectors, generation {})",
            path.display(),
            persisted.vectors.len() / persisted.dimension,
            persisted.generation
        );

        Ok(Self {
            dimension: persisted.dimension,
            data: persisted.vectors,
            generation: persisted.generation,
        })
    }

    /// Appends one vector and returns its position.
    ///
    /// Normalization is the caller's job; only the dimension is checked.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize, IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let position = self.len();
        self.data.extend_from_slice(vector);
        Ok(position)
    }

    /// Overwrites the vector stored at `position`.
    pub fn set(&mut self, position: usize, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if position >= self.len() {
            return Err(IndexError::InvalidRecord(format!(
                "no vector at position {position} (index holds {})",
                self.len()
            )));
        }
        let start = position * self.dimension;
        self.data[start..start + self.dimension].copy_from_slice(vector);
        Ok(())
    }

    /// Returns up to `k` `(position, score)` pairs by descending inner product.
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| (position, inner_product(query, row)))
            .collect();

        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k);
        Ok(scored)
    }

    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let persisted = PersistedIndex {
            magic: MAGIC,
            version: FORMAT_VERSION,
            dimension: self.dimension,
            generation: self.generation,
            vectors: self.data.clone(),
        };
        let bytes = bincode::serialize(&persisted)?;
        write_atomic(path, &bytes)
    }

    /// Drops every vector at or after `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.data.truncate(len * self.dimension);
    }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.dimension).nth(position)
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }
}

/// Scales `vector` to unit length.
///
/// A zero or non-finite norm is `DegenerateVector`; dividing by it would poison the index.
pub fn normalize(vector: &[f32]) -> Result<Vec<f32>, IndexError> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(IndexError::DegenerateVector);
    }
    Ok(vector.iter().map(|x| x / norm).collect())
}

pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
