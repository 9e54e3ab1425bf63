//! Linear system solver: `A x = f` per sample, with first-tier decomposition

use std::collections::BTreeSet;

use faer::prelude::*;
use faer::sparse::linalg::solvers::Lu;
use faer::sparse::SparseColMat;
use faer::Mat;
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use tracing::debug;
use truck_lci_types::{Error, Result};

use crate::model::{Requirements, TechnologyMatrix, VehicleRequirement};
use crate::service::vehicle_inventory::VehicleColumns;

/// Sparse LU factorization of one sample of the technology matrix
pub struct SampleSolver {
    sample: usize,
    dimension: usize,
    lu: Lu<usize, f64>,
}

impl SampleSolver {
    /// Factorize the non-zeros of `A[sample]`
    pub fn factorize(matrix: &TechnologyMatrix, sample: usize) -> Result<Self> {
        let n = matrix.dimension();
        let triplets: Vec<(usize, usize, f64)> = matrix
            .sample(sample)
            .indexed_iter()
            .filter(|(_, v)| **v != 0.0)
            .map(|((row, column), v)| (row, column, *v))
            .collect();
        let sparse = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, &triplets)
            .map_err(|e| Error::DimensionMismatch(format!("sample {}: {:?}", sample, e)))?;
        let lu = sparse
            .sp_lu()
            .map_err(|_| Error::SingularMatrix { sample })?;
        debug!(sample, dimension = n, non_zeros = triplets.len(), "sample factorized");
        Ok(Self {
            sample,
            dimension: n,
            lu,
        })
    }

    /// Supply vector delivering one unit of `activity`
    pub fn resolve(&self, activity: usize) -> Result<Array1<f64>> {
        let x = self.resolve_many(&[activity])?;
        Ok(x.row(0).to_owned())
    }

    /// Supply vectors for one unit of each of `activities`, one row per
    /// activity, from a single multi-column solve
    pub fn resolve_many(&self, activities: &[usize]) -> Result<Array2<f64>> {
        if let Some(&activity) = activities.iter().find(|&&a| a >= self.dimension) {
            return Err(Error::DimensionMismatch(format!(
                "activity {} outside a {}-activity matrix",
                activity, self.dimension
            )));
        }
        if activities.is_empty() {
            return Ok(Array2::zeros((0, self.dimension)));
        }

        let mut demand = Mat::<f64>::zeros(self.dimension, activities.len());
        for (k, &activity) in activities.iter().enumerate() {
            demand[(activity, k)] = 1.0;
        }
        let x = self.lu.solve(&demand);
        let out = Array2::from_shape_fn((activities.len(), self.dimension), |(k, i)| x[(i, k)]);
        if out.iter().any(|v| !v.is_finite()) {
            return Err(Error::SingularMatrix {
                sample: self.sample,
            });
        }
        Ok(out)
    }
}

/// Supply vector delivering one unit of `activity` in `sample`
pub fn resolve(matrix: &TechnologyMatrix, activity: usize, sample: usize) -> Result<Array1<f64>> {
    SampleSolver::factorize(matrix, sample)?.resolve(activity)
}

/// Rows with a non-zero coefficient in any vehicle column in any sample,
/// excluding the vehicle block itself, ascending
pub fn first_tier(matrix: &TechnologyMatrix, vehicle_block: &[usize]) -> Vec<usize> {
    let block: BTreeSet<usize> = vehicle_block.iter().copied().collect();
    let mut tier = BTreeSet::new();
    for sample in 0..matrix.samples() {
        for &column in vehicle_block {
            for (row, value) in matrix.column(sample, column).iter().enumerate() {
                if *value != 0.0 && !block.contains(&row) {
                    tier.insert(row);
                }
            }
        }
    }
    tier.into_iter().collect()
}

/// Solve every first-tier activity once per sample and express each
/// vehicle's transport as a combination of those solutions.
///
/// Vehicle amounts `c` solve the vehicle-block subsystem `A_VV c = e_j`,
/// which expands the truck column inside its transport column; the weight
/// of first-tier activity `m` is then `-Σ_v A[m, v] c_v`.
pub fn solve_requirements(matrix: &TechnologyMatrix, vehicles: &VehicleColumns) -> Result<Requirements> {
    solve_requirements_with_progress(matrix, vehicles, |_, _| {})
}

/// [`solve_requirements`], calling `progress(done, total)` after each sample
pub fn solve_requirements_with_progress<F>(
    matrix: &TechnologyMatrix,
    vehicles: &VehicleColumns,
    mut progress: F,
) -> Result<Requirements>
where
    F: FnMut(usize, usize),
{
    let block = vehicles.vehicle_block();
    let tier = first_tier(matrix, &block);
    let samples = matrix.samples();
    debug!(first_tier = tier.len(), vehicles = vehicles.len(), samples, "solving requirements");

    let mut solutions = Vec::with_capacity(samples);
    let mut requirements: Vec<VehicleRequirement> = vehicles
        .iter()
        .map(|v| VehicleRequirement {
            cell: v.cell,
            transport: v.transport,
            weights: Array2::zeros((samples, tier.len())),
            vehicle_block: Vec::with_capacity(samples),
        })
        .collect();

    for sample in 0..samples {
        let solver = SampleSolver::factorize(matrix, sample)?;
        solutions.push(solver.resolve_many(&tier)?);

        let plane = matrix.sample(sample);
        let nb = block.len();
        let sub = DMatrix::from_fn(nb, nb, |i, j| plane[[block[i], block[j]]]);
        let block_lu = sub.lu();
        for requirement in requirements.iter_mut() {
            let j = block.binary_search(&requirement.transport).map_err(|_| {
                Error::UnknownActivity(format!("transport column {}", requirement.transport))
            })?;
            let mut e = DVector::<f64>::zeros(nb);
            e[j] = 1.0;
            let c = block_lu
                .solve(&e)
                .filter(|c| c.iter().all(|v| v.is_finite()))
                .ok_or(Error::SingularMatrix { sample })?;

            let amounts: Vec<(usize, f64)> = block
                .iter()
                .zip(c.iter())
                .filter(|(_, amount)| **amount != 0.0)
                .map(|(&activity, &amount)| (activity, amount))
                .collect();
            for (k, &m) in tier.iter().enumerate() {
                let weight: f64 = amounts
                    .iter()
                    .map(|&(v, amount)| plane[[m, v]] * amount)
                    .sum();
                requirement.weights[[sample, k]] = -weight;
            }
            requirement.vehicle_block.push(amounts);
        }
        progress(sample + 1, samples);
    }

    Ok(Requirements {
        first_tier: tier,
        solutions,
        vehicles: requirements,
    })
}
