//! Sparse feature vectors.

use serde::{Deserialize, Serialize};

/// A sparse vector of `(feature index, weight)` entries sorted by index.
///
/// Absent indices are implicit zeros. Indices are unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// Create an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from unordered entries. Duplicate indices are summed and
    /// explicit zeros are dropped.
    pub fn from_entries(mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_by_key(|&(idx, _)| idx);
        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(entries.len());
        for (idx, value) in entries {
            match merged.last_mut() {
                Some((last, acc)) if *last == idx => *acc += value,
                _ => merged.push((idx, value)),
            }
        }
        merged.retain(|&(_, value)| value != 0.0);
        Self { entries: merged }
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Whether every component is zero.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored entries in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Stored indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|&(idx, _)| idx)
    }

    /// Value at `index`, zero when absent.
    pub fn get(&self, index: usize) -> f64 {
        self.entries
            .binary_search_by_key(&index, |&(idx, _)| idx)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0.0)
    }

    /// Replace every stored value with `f(index, value)`.
    pub fn map_values<F>(&mut self, f: F)
    where
        F: Fn(usize, f64) -> f64,
    {
        for (idx, value) in &mut self.entries {
            *value = f(*idx, *value);
        }
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.entries
            .iter()
            .map(|&(_, v)| v * v)
            .sum::<f64>()
            .sqrt()
    }

    /// Scale to unit Euclidean norm. A zero vector is left unchanged.
    pub fn l2_normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for (_, value) in &mut self.entries {
                *value /= norm;
            }
        }
    }

    /// Dot product with a dense vector. Indices beyond `dense` count as zero.
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.entries
            .iter()
            .filter_map(|&(idx, v)| dense.get(idx).map(|w| v * w))
            .sum()
    }

    /// `dense += scale * self`.
    pub fn add_scaled_to(&self, dense: &mut [f64], scale: f64) {
        for &(idx, v) in &self.entries {
            if let Some(slot) = dense.get_mut(idx) {
                *slot += scale * v;
            }
        }
    }
}
