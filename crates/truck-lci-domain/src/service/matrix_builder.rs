//! Technology matrix builder

use std::collections::BTreeMap;

use ndarray::{Array2, Array3, Axis};
use tracing::{debug, warn};
use truck_lci_types::{Error, Result};

use crate::model::{BaseMatrix, CoercionDiagnostic, TechnologyMatrix, VehicleCell};

/// How an injected value combines with the existing coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectMode {
    Set,
    Add,
    Scale,
}

/// A vehicle cell and the matrix column holding it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleTarget {
    pub cell: VehicleCell,
    pub column: usize,
}

/// Mutable technology matrix under construction.
///
/// Consumed by [`TechnologyMatrixBuilder::finish`], which hands back the
/// immutable matrix the solver works on.
#[derive(Debug)]
pub struct TechnologyMatrixBuilder {
    data: Array3<f64>,
    coerced: BTreeMap<(usize, usize), usize>,
}

impl TechnologyMatrixBuilder {
    /// Identity over `dimension` activities with the base block written into
    /// its top-left corner, broadcast over `samples`
    pub fn from_base(base: &BaseMatrix, dimension: usize, samples: usize) -> Result<Self> {
        if base.dimension() > dimension {
            return Err(Error::DimensionMismatch(format!(
                "base matrix covers {} activities, registry holds {}",
                base.dimension(),
                dimension
            )));
        }
        let mut plane = Array2::<f64>::eye(dimension);
        for &(row, col, value) in base.entries() {
            if row >= dimension || col >= dimension {
                return Err(Error::DimensionMismatch(format!(
                    "base entry ({}, {}) outside {} activities",
                    row, col, dimension
                )));
            }
            plane[[row, col]] = value;
        }
        let samples = samples.max(1);
        let data = plane
            .insert_axis(Axis(0))
            .broadcast((samples, dimension, dimension))
            .map(|view| view.to_owned())
            .ok_or_else(|| Error::DimensionMismatch("cannot broadcast base matrix".to_string()))?;
        debug!(dimension, samples, entries = base.entries().len(), "technology matrix initialised");
        let mut builder = Self {
            data,
            coerced: BTreeMap::new(),
        };
        builder.coerce_non_finite_base();
        Ok(builder)
    }

    pub fn dimension(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn samples(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn get(&self, sample: usize, product: usize, activity: usize) -> f64 {
        self.data[[sample, product, activity]]
    }

    /// Write `value(cell, sample)` into `A[sample, product, target.column]`
    /// for every target and sample
    pub fn inject<F>(&mut self, product: usize, targets: &[VehicleTarget], mode: InjectMode, value: F)
    where
        F: Fn(VehicleCell, usize) -> f64,
    {
        for target in targets {
            for sample in 0..self.samples() {
                self.apply(sample, product, target.column, mode, value(target.cell, sample));
            }
        }
    }

    /// Same coefficient for every sample
    pub fn set_all_samples(&mut self, product: usize, activity: usize, mode: InjectMode, value: f64) {
        for sample in 0..self.samples() {
            self.apply(sample, product, activity, mode, value);
        }
    }

    fn apply(&mut self, sample: usize, product: usize, activity: usize, mode: InjectMode, value: f64) {
        let value = if value.is_finite() {
            value
        } else {
            *self.coerced.entry((product, activity)).or_insert(0) += 1;
            0.0
        };
        let cell = &mut self.data[[sample, product, activity]];
        match mode {
            InjectMode::Set => *cell = value,
            InjectMode::Add => *cell += value,
            InjectMode::Scale => *cell *= value,
        }
    }

    fn coerce_non_finite_base(&mut self) {
        for ((_, product, activity), v) in self.data.indexed_iter_mut() {
            if !v.is_finite() {
                *v = 0.0;
                *self.coerced.entry((product, activity)).or_insert(0) += 1;
            }
        }
    }

    /// Freeze the matrix. Fails when a reference flow (diagonal entry) is zero.
    pub fn finish(self) -> Result<(TechnologyMatrix, Vec<CoercionDiagnostic>)> {
        for (sample, plane) in self.data.axis_iter(Axis(0)).enumerate() {
            if let Some(i) = plane.diag().iter().position(|v| *v == 0.0) {
                return Err(Error::ReferenceData(format!(
                    "activity {} has a zero reference flow in sample {}",
                    i, sample
                )));
            }
        }
        let diagnostics: Vec<CoercionDiagnostic> = self
            .coerced
            .into_iter()
            .map(|((product, activity), samples)| CoercionDiagnostic {
                product,
                activity,
                samples,
            })
            .collect();
        for d in &diagnostics {
            warn!(
                product = d.product,
                activity = d.activity,
                samples = d.samples,
                "non-finite coefficient replaced by zero"
            );
        }
        Ok((TechnologyMatrix::from_array(self.data), diagnostics))
    }
}
