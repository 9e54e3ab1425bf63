//! Calculation outputs: the result array and the solved requirements

use ndarray::{Array1, Array2, Array4, Array6, ArrayView1, Axis};
use serde::Serialize;
use truck_lci_types::{FunctionalUnit, Powertrain, ResultCategory, Size};

use super::parameters::VehicleCell;

/// Impacts shaped (impact category, size, powertrain, year, result category, sample)
#[derive(Debug, Clone)]
pub struct ResultArray {
    impact_categories: Vec<String>,
    sizes: Vec<Size>,
    powertrains: Vec<Powertrain>,
    years: Vec<u16>,
    functional_unit: FunctionalUnit,
    values: Array6<f64>,
}

/// One flattened entry of a [`ResultArray`], averaged over samples
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    pub impact_category: String,
    pub size: Size,
    pub powertrain: Powertrain,
    pub year: u16,
    pub result_category: &'static str,
    pub value: f64,
}

impl ResultArray {
    pub(crate) fn zeros(
        impact_categories: Vec<String>,
        sizes: Vec<Size>,
        powertrains: Vec<Powertrain>,
        years: Vec<u16>,
        samples: usize,
    ) -> Self {
        let values = Array6::zeros((
            impact_categories.len(),
            sizes.len(),
            powertrains.len(),
            years.len(),
            ResultCategory::ALL.len(),
            samples,
        ));
        Self {
            impact_categories,
            sizes,
            powertrains,
            years,
            functional_unit: FunctionalUnit::Tkm,
            values,
        }
    }

    pub(crate) fn add(
        &mut self,
        impact: usize,
        cell: VehicleCell,
        category: ResultCategory,
        sample: usize,
        value: f64,
    ) {
        self.values[[
            impact,
            cell.size,
            cell.powertrain,
            cell.year,
            category.position(),
            sample,
        ]] += value;
    }

    pub fn impact_categories(&self) -> &[String] {
        &self.impact_categories
    }

    pub fn sizes(&self) -> &[Size] {
        &self.sizes
    }

    pub fn powertrains(&self) -> &[Powertrain] {
        &self.powertrains
    }

    pub fn years(&self) -> &[u16] {
        &self.years
    }

    pub fn samples(&self) -> usize {
        self.values.len_of(Axis(5))
    }

    pub fn functional_unit(&self) -> FunctionalUnit {
        self.functional_unit
    }

    pub fn values(&self) -> &Array6<f64> {
        &self.values
    }

    pub fn get(
        &self,
        impact: usize,
        cell: VehicleCell,
        category: ResultCategory,
        sample: usize,
    ) -> f64 {
        self.values[[
            impact,
            cell.size,
            cell.powertrain,
            cell.year,
            category.position(),
            sample,
        ]]
    }

    /// Sum over result categories for one vehicle and sample
    pub fn total(&self, impact: usize, cell: VehicleCell, sample: usize) -> f64 {
        ResultCategory::ALL
            .iter()
            .map(|c| self.get(impact, cell, *c, sample))
            .sum()
    }

    /// Multiply every entry by a per-vehicle, per-sample factor shaped
    /// (size, powertrain, year, sample)
    pub fn scaled(mut self, factor: &Array4<f64>) -> Self {
        for mut impact in self.values.axis_iter_mut(Axis(0)) {
            for ((size, powertrain, year, _, sample), v) in impact.indexed_iter_mut() {
                *v *= factor[[size, powertrain, year, sample]];
            }
        }
        self
    }

    /// Re-express per vehicle-km, given cargo mass in tonnes per vehicle and sample
    pub fn to_vehicle_km(self, cargo_t: &Array4<f64>) -> Self {
        if self.functional_unit == FunctionalUnit::Vkm {
            return self;
        }
        let mut out = self.scaled(cargo_t);
        out.functional_unit = FunctionalUnit::Vkm;
        out
    }

    /// Zero every vehicle and sample whose mask entry is 0, whatever the
    /// value held there (NaN included)
    pub fn masked(mut self, mask: &Array4<f64>) -> Self {
        for mut impact in self.values.axis_iter_mut(Axis(0)) {
            for ((size, powertrain, year, _, sample), v) in impact.indexed_iter_mut() {
                if mask[[size, powertrain, year, sample]] == 0.0 {
                    *v = 0.0;
                }
            }
        }
        self
    }

    /// Sample-mean records, skipping exact zeros
    pub fn records(&self) -> Vec<ResultRecord> {
        let Some(mean) = self.values.mean_axis(Axis(5)) else {
            return Vec::new();
        };
        mean.indexed_iter()
            .filter(|(_, v)| **v != 0.0)
            .map(|((i, s, p, y, c), v)| ResultRecord {
                impact_category: self.impact_categories[i].clone(),
                size: self.sizes[s],
                powertrain: self.powertrains[p],
                year: self.years[y],
                result_category: ResultCategory::ALL[c].label(),
                value: *v,
            })
            .collect()
    }
}

/// Solved requirements for the vehicles in scope, usable by export adapters
#[derive(Debug, Clone)]
pub struct Requirements {
    /// Activities feeding a vehicle column, ascending
    pub first_tier: Vec<usize>,
    /// Per sample, one solution per first-tier activity, shaped (first tier, activities)
    pub solutions: Vec<Array2<f64>>,
    /// Per vehicle transport column
    pub vehicles: Vec<VehicleRequirement>,
}

/// How one unit of a vehicle's transport decomposes onto the first tier
#[derive(Debug, Clone)]
pub struct VehicleRequirement {
    pub cell: VehicleCell,
    pub transport: usize,
    /// Per sample, weights over `first_tier`, shaped (samples, first tier)
    pub weights: Array2<f64>,
    /// Per sample, amounts of vehicle-block activities, as (activity, amount)
    pub vehicle_block: Vec<Vec<(usize, f64)>>,
}

impl Requirements {
    /// Full supply vector of one vehicle's transport in one sample
    pub fn assemble(&self, vehicle: &VehicleRequirement, sample: usize) -> Array1<f64> {
        let solutions = &self.solutions[sample];
        let weights: ArrayView1<'_, f64> = vehicle.weights.row(sample);
        let mut x = weights.dot(solutions);
        for &(activity, amount) in &vehicle.vehicle_block[sample] {
            x[activity] += amount;
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array() -> ResultArray {
        let mut r = ResultArray::zeros(
            vec!["climate change".to_string()],
            vec![Size::T40],
            vec![Powertrain::IcevD, Powertrain::Bev],
            vec![2020],
            2,
        );
        let diesel = VehicleCell {
            size: 0,
            powertrain: 0,
            year: 0,
        };
        r.add(0, diesel, ResultCategory::DirectExhaust, 0, 0.06);
        r.add(0, diesel, ResultCategory::DirectExhaust, 1, 0.08);
        r.add(0, diesel, ResultCategory::Glider, 0, 0.01);
        r
    }

    #[test]
    fn test_total_sums_categories() {
        let r = array();
        let cell = VehicleCell {
            size: 0,
            powertrain: 0,
            year: 0,
        };
        assert!((r.total(0, cell, 0) - 0.07).abs() < 1e-12);
    }

    #[test]
    fn test_mask_and_vehicle_km() {
        let cell = VehicleCell {
            size: 0,
            powertrain: 0,
            year: 0,
        };
        let mut mask = Array4::ones((1, 2, 1, 2));
        mask[[0, 0, 0, 1]] = 0.0;
        let r = array().masked(&mask);
        assert_eq!(r.get(0, cell, ResultCategory::DirectExhaust, 1), 0.0);

        let cargo = Array4::from_elem((1, 2, 1, 2), 20.0);
        let r = r.to_vehicle_km(&cargo);
        assert_eq!(r.functional_unit(), FunctionalUnit::Vkm);
        assert!((r.get(0, cell, ResultCategory::DirectExhaust, 0) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_mask_clears_non_finite_vehicle_km() {
        let cell = VehicleCell {
            size: 0,
            powertrain: 0,
            year: 0,
        };
        let mut cargo = Array4::from_elem((1, 2, 1, 2), 20.0);
        cargo[[0, 0, 0, 0]] = f64::NAN;
        let mut mask = Array4::ones((1, 2, 1, 2));
        mask[[0, 0, 0, 0]] = 0.0;

        let r = array().to_vehicle_km(&cargo).masked(&mask);
        assert_eq!(r.total(0, cell, 0), 0.0);
        assert!((r.total(0, cell, 1) - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_records_average_samples() {
        let records = array().records();
        let exhaust = records
            .iter()
            .find(|r| r.result_category == "direct - exhaust")
            .unwrap();
        assert!((exhaust.value - 0.07).abs() < 1e-12);
        assert_eq!(records.len(), 2);
    }
}
