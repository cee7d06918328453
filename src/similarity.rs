//! Inner-product scoring and top-k selection.
//!
//! Stored vectors and queries are unit-normalized, so the inner product is the
//! cosine similarity. Ranking is a total order: higher score first, and for
//! equal scores the lower row index first.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Compute the inner product of two equally sized slices
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// A row index paired with its similarity score.
#[derive(Debug, Clone, Copy)]
pub struct ScoredRow {
    pub row: usize,
    pub score: f32,
}

impl ScoredRow {
    pub fn new(row: usize, score: f32) -> Self {
        Self { row, score }
    }
}

impl PartialEq for ScoredRow {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredRow {}

impl PartialOrd for ScoredRow {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Greater means ranked earlier: higher score, then lower row.
impl Ord for ScoredRow {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.row.cmp(&self.row))
    }
}

/// Bounded collector that keeps the `k` best rows seen so far.
///
/// The heap top is the worst kept row, so each candidate costs one comparison
/// once the collector is full.
#[derive(Debug)]
pub struct TopK {
    k: usize,
    heap: BinaryHeap<Reverse<ScoredRow>>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
        }
    }

    /// Offer a candidate row.
    pub fn push(&mut self, candidate: ScoredRow) {
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(Reverse(candidate));
            return;
        }
        if let Some(Reverse(worst)) = self.heap.peek() {
            if candidate > *worst {
                self.heap.pop();
                self.heap.push(Reverse(candidate));
            }
        }
    }

    /// Fold another collector's rows into this one.
    pub fn merge(mut self, other: TopK) -> TopK {
        for Reverse(candidate) in other.heap {
            self.push(candidate);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Kept rows, best first.
    pub fn into_sorted_vec(self) -> Vec<ScoredRow> {
        let mut rows: Vec<ScoredRow> = self.heap.into_iter().map(|Reverse(r)| r).collect();
        rows.sort_by(|a, b| b.cmp(a));
        rows
    }
}
