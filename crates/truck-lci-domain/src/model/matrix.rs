//! Technology matrices: the base coordinate table and the finalized matrix

use ndarray::{Array3, ArrayView1, ArrayView2, Axis};
use serde::Serialize;
use truck_lci_types::{Error, Result};

/// Background exchanges read from reference data, as (row, column, value)
/// triples over the first `dimension` activities.
///
/// Entries are written over an identity matrix, so a diagonal entry
/// replaces the default reference flow of 1.
#[derive(Debug, Clone, Default)]
pub struct BaseMatrix {
    dimension: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl BaseMatrix {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    pub fn with_entries(dimension: usize, entries: Vec<(usize, usize, f64)>) -> Result<Self> {
        let mut base = Self::new(dimension);
        for (row, col, value) in entries {
            base.push(row, col, value)?;
        }
        Ok(base)
    }

    pub fn push(&mut self, row: usize, column: usize, value: f64) -> Result<()> {
        if row >= self.dimension || column >= self.dimension {
            return Err(Error::DimensionMismatch(format!(
                "base entry ({}, {}) outside a {}x{} matrix",
                row, column, self.dimension, self.dimension
            )));
        }
        self.entries.push((row, column, value));
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn entries(&self) -> &[(usize, usize, f64)] {
        &self.entries
    }
}

/// A non-finite coefficient replaced by zero while building the matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoercionDiagnostic {
    /// Product row
    pub product: usize,
    /// Activity column
    pub activity: usize,
    /// Number of samples affected
    pub samples: usize,
}

/// Finalized technology matrix, shaped (samples, products, activities).
///
/// Only produced by the builder; exposes no mutators.
#[derive(Debug, Clone)]
pub struct TechnologyMatrix {
    data: Array3<f64>,
}

impl TechnologyMatrix {
    pub(crate) fn from_array(data: Array3<f64>) -> Self {
        Self { data }
    }

    pub fn samples(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn dimension(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn get(&self, sample: usize, product: usize, activity: usize) -> f64 {
        self.data[[sample, product, activity]]
    }

    pub fn sample(&self, sample: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), sample)
    }

    /// Exchanges of one activity in one sample
    pub fn column(&self, sample: usize, activity: usize) -> ArrayView1<'_, f64> {
        self.data
            .index_axis(Axis(0), sample)
            .index_axis_move(Axis(1), activity)
    }
}
