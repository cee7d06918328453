//! Embedding vector type and normalization

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};

/// Norms at or below this value are treated as zero.
pub const DEGENERATE_NORM: f32 = 1e-12;

/// A dense embedding in D-dimensional space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    /// Create a new vector from a Vec<f32>
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Get the dimension of the vector
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Get the underlying data as a slice
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume the vector and return its components
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    /// Compute the L2 norm (magnitude) of the vector
    pub fn norm(&self) -> f32 {
        l2_norm(&self.data)
    }

    /// Normalize the vector to unit length.
    ///
    /// `context` names the vector in the error ("row 3", "query").
    pub fn normalize(&mut self, context: &str) -> Result<()> {
        let norm = norm_f64(&self.data);
        if !norm.is_finite() || norm <= f64::from(DEGENERATE_NORM) {
            return Err(SearchError::DegenerateVector {
                context: context.to_string(),
                norm: norm as f32,
            });
        }
        for x in &mut self.data {
            *x = (f64::from(*x) / norm) as f32;
        }
        Ok(())
    }

    /// Create a normalized copy of the vector
    pub fn normalized(&self, context: &str) -> Result<Vector> {
        let mut v = self.clone();
        v.normalize(context)?;
        Ok(v)
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Vector::new(data)
    }
}

/// L2 norm of a raw slice
pub fn l2_norm(data: &[f32]) -> f32 {
    norm_f64(data) as f32
}

// Squares accumulate in f64 so large finite components do not overflow.
fn norm_f64(data: &[f32]) -> f64 {
    data.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}
