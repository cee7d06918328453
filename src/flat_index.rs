//! Brute-force flat index: exact O(N·D) inner-product k-NN search

use std::ops::Range;

use ndarray::{Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::error::{Result, SearchError};
use crate::similarity::{ScoredRow, TopK};
use crate::vector::Vector;

/// Stores at or above this many rows are scanned in parallel.
pub const PARALLEL_MIN_ROWS: usize = 8192;

const MIN_CHUNK_ROWS: usize = 1024;

/// A flat index over an N×D matrix of unit-normalized rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    matrix: Array2<f32>,
}

impl FlatIndex {
    /// Normalize `vectors` and stack them into an index.
    ///
    /// All vectors must share the dimension of the first one.
    pub fn build(vectors: Vec<Vector>) -> Result<Self> {
        let dimension = vectors.first().map(|v| v.dimension()).unwrap_or(0);
        let mut data = Vec::with_capacity(vectors.len() * dimension);

        for (row, mut vector) in vectors.into_iter().enumerate() {
            if vector.dimension() != dimension {
                return Err(SearchError::DimensionMismatch {
                    context: format!("row {}", row),
                    expected: dimension,
                    actual: vector.dimension(),
                });
            }
            vector.normalize(&format!("row {}", row))?;
            data.extend_from_slice(vector.as_slice());
        }

        let rows = data.len().checked_div(dimension).unwrap_or(0);
        Self::from_normalized(rows, dimension, data)
    }

    /// Wrap rows that are already unit-normalized (e.g. read back from disk).
    pub fn from_normalized(rows: usize, dimension: usize, data: Vec<f32>) -> Result<Self> {
        let matrix = Array2::from_shape_vec((rows, dimension), data).map_err(|e| {
            SearchError::InvalidArgument(format!(
                "cannot shape {} x {} matrix: {}",
                rows, dimension, e
            ))
        })?;
        Ok(Self { matrix })
    }

    /// An index with no rows.
    pub fn empty(dimension: usize) -> Self {
        Self {
            matrix: Array2::zeros((0, dimension)),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row dimension.
    pub fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    /// Read-only view of the stored matrix.
    pub fn matrix(&self) -> ArrayView2<'_, f32> {
        self.matrix.view()
    }

    /// Get a stored row.
    pub fn row(&self, row: usize) -> Option<ArrayView1<'_, f32>> {
        (row < self.len()).then(|| self.matrix.row(row))
    }

    /// Top-`k` rows for a unit-normalized query, best first.
    ///
    /// Large indexes are scanned in parallel; the result is the same as
    /// [`FlatIndex::search_serial`].
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredRow> {
        if self.len() >= PARALLEL_MIN_ROWS {
            self.search_parallel(query, k)
        } else {
            self.search_serial(query, k)
        }
    }

    /// Single-threaded reference scan.
    pub fn search_serial(&self, query: &[f32], k: usize) -> Vec<ScoredRow> {
        let query = ArrayView1::from(query);
        self.scan(&query, 0..self.len(), k).into_sorted_vec()
    }

    /// Partition rows across rayon workers and merge their top-k heaps.
    pub fn search_parallel(&self, query: &[f32], k: usize) -> Vec<ScoredRow> {
        let query = ArrayView1::from(query);
        let n = self.len();
        let chunk = (n / rayon::current_num_threads().max(1)).max(MIN_CHUNK_ROWS);
        let chunks = n.div_ceil(chunk);

        (0..chunks)
            .into_par_iter()
            .map(|c| {
                let start = c * chunk;
                self.scan(&query, start..(start + chunk).min(n), k)
            })
            .reduce(|| TopK::new(k), TopK::merge)
            .into_sorted_vec()
    }

    fn scan(&self, query: &ArrayView1<'_, f32>, rows: Range<usize>, k: usize) -> TopK {
        let mut top = TopK::new(k);
        for row in rows {
            let score = self.matrix.row(row).dot(query);
            top.push(ScoredRow::new(row, score));
        }
        top
    }
}
