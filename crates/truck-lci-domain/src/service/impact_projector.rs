//! Impact projection and aggregation into result categories

use std::collections::HashMap;

use ndarray::{Array1, Array2, ArrayView1};
use tracing::{debug, warn};
use truck_lci_types::{ResultCategory, Result};

use crate::model::impact::project;
use crate::model::{
    ActivityRegistry, ImpactMatrix, Requirements, ResultArray, SplitRule, VehicleParameters,
    YearMode,
};

/// Static assignment of activities to result categories
#[derive(Debug, Clone, Default)]
pub struct CategoryMembership {
    categories: HashMap<usize, ResultCategory>,
}

impl CategoryMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `activity` to `category`. The first claim wins; a later claim
    /// for a different category is reported and ignored.
    pub fn claim(&mut self, activity: usize, category: ResultCategory) -> bool {
        match self.categories.get(&activity) {
            Some(existing) if *existing == category => true,
            Some(existing) => {
                warn!(
                    activity,
                    kept = %existing,
                    ignored = %category,
                    "activity claimed by two result categories"
                );
                false
            }
            None => {
                self.categories.insert(activity, category);
                true
            }
        }
    }

    pub fn claim_all(&mut self, assignments: &[(usize, ResultCategory)]) {
        for &(activity, category) in assignments {
            self.claim(activity, category);
        }
    }

    /// Claim every activity matched by a split rule, in rule order.
    /// Rules matching nothing are reported and skipped.
    pub fn apply_split_table(&mut self, registry: &ActivityRegistry, rules: &[SplitRule]) {
        for rule in rules {
            let selector = rule.selector();
            let matched = registry.resolve(&selector);
            if matched.is_empty() {
                warn!(%selector, category = %rule.category, "split rule matches no activity");
                continue;
            }
            for activity in matched {
                self.claim(activity, rule.category);
            }
        }
    }

    pub fn category_of(&self, activity: usize) -> Option<ResultCategory> {
        self.categories.get(&activity).copied()
    }

    /// Activities of one category, ascending
    pub fn members(&self, category: ResultCategory) -> Vec<usize> {
        let mut members: Vec<usize> = self
            .categories
            .iter()
            .filter(|(_, c)| **c == category)
            .map(|(a, _)| *a)
            .collect();
        members.sort_unstable();
        members
    }

    /// Those of `activities` no category claims
    pub fn unclaimed(&self, activities: &[usize]) -> Vec<usize> {
        activities
            .iter()
            .copied()
            .filter(|a| !self.categories.contains_key(a))
            .collect()
    }
}

/// Projects supply vectors through the impact matrix of a given year
pub struct ImpactProjector<'a> {
    impacts: &'a ImpactMatrix,
    mode: YearMode,
    dimension: usize,
}

impl<'a> ImpactProjector<'a> {
    pub fn new(impacts: &'a ImpactMatrix, mode: YearMode, dimension: usize) -> Self {
        Self {
            impacts,
            mode,
            dimension,
        }
    }

    pub fn categories(&self) -> &[String] {
        self.impacts.categories()
    }

    pub fn factors(&self, year: u16) -> Result<Array2<f64>> {
        self.impacts.at_year(year, self.mode, self.dimension)
    }

    /// `B(year) · x`
    pub fn project(&self, x: ArrayView1<'_, f64>, year: u16) -> Result<Array1<f64>> {
        Ok(project(&self.factors(year)?, x))
    }
}

/// Result array plus the first-tier activities no category claimed
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub results: ResultArray,
    pub unclaimed: Vec<usize>,
}

/// Bucket each vehicle's first-tier contributions into result categories.
///
/// Result category `r` of a vehicle receives `Σ w_m · B(year) · x(m)` over
/// the first-tier activities `m` that `r` claims.
pub fn aggregate(
    requirements: &Requirements,
    params: &VehicleParameters,
    projector: &ImpactProjector<'_>,
    membership: &CategoryMembership,
) -> Result<Aggregation> {
    let samples = requirements.solutions.len();
    let mut results = ResultArray::zeros(
        projector.categories().to_vec(),
        params.sizes().to_vec(),
        params.powertrains().to_vec(),
        params.years().to_vec(),
        samples,
    );
    let claimed: Vec<(usize, ResultCategory)> = requirements
        .first_tier
        .iter()
        .enumerate()
        .filter_map(|(k, &m)| membership.category_of(m).map(|c| (k, c)))
        .collect();
    let unclaimed = membership.unclaimed(&requirements.first_tier);
    if !unclaimed.is_empty() {
        warn!(
            count = unclaimed.len(),
            "first-tier activities without result category, contributions dropped"
        );
    }

    for (yi, &year) in params.years().iter().enumerate() {
        let factors = projector.factors(year)?;
        for (sample, solutions) in requirements.solutions.iter().enumerate() {
            // (impact categories, first tier)
            let per_activity = factors.dot(&solutions.t());
            for vehicle in requirements.vehicles.iter().filter(|v| v.cell.year == yi) {
                for &(k, category) in &claimed {
                    let weight = vehicle.weights[[sample, k]];
                    if weight == 0.0 {
                        continue;
                    }
                    for (impact, value) in per_activity.column(k).iter().enumerate() {
                        results.add(impact, vehicle.cell, category, sample, weight * value);
                    }
                }
            }
        }
        debug!(year, "impacts aggregated");
    }

    Ok(Aggregation { results, unclaimed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProceduralActivity, VehicleCell};
    use crate::service::test_support::*;
    use truck_lci_types::{FuelFamily, FuelType, Powertrain, Size};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 + 1e-9 * b.abs()
    }

    fn cell(fx: &Fixture, powertrain: Powertrain) -> VehicleCell {
        fx.params.cell_of(Size::T40, powertrain, 2020).unwrap()
    }

    fn run(fx: &Fixture) -> (Solved, Aggregation) {
        let solved = solve(fx);
        let projector = ImpactProjector::new(&fx.impacts, YearMode::Interpolated, fx.registry.len());
        let aggregation =
            aggregate(&solved.requirements, &fx.params, &projector, &solved.membership).unwrap();
        (solved, aggregation)
    }

    #[test]
    fn test_categories_sum_to_direct_projection() {
        let fx = fixture();
        let (solved, aggregation) = run(&fx);
        assert!(aggregation.unclaimed.is_empty());

        let projector = ImpactProjector::new(&fx.impacts, YearMode::Interpolated, fx.registry.len());
        for vehicle in &solved.requirements.vehicles {
            for sample in 0..fx.params.samples() {
                let x = solved.requirements.assemble(vehicle, sample);
                let direct = projector.project(x.view(), 2020).unwrap();
                let total = aggregation.results.total(0, vehicle.cell, sample);
                assert!(close(total, direct[0]), "{} vs {}", total, direct[0]);
            }
        }
    }

    #[test]
    fn test_assembled_supply_solves_transport_demand() {
        let fx = fixture();
        let (solved, _) = run(&fx);
        for vehicle in &solved.requirements.vehicles {
            let x = solved.requirements.assemble(vehicle, 0);
            let f = solved.matrix.sample(0).dot(&x);
            for (i, value) in f.iter().enumerate() {
                let expected = if i == vehicle.transport { 1.0 } else { 0.0 };
                assert!((value - expected).abs() < 1e-9, "row {}: {}", i, value);
            }
        }
    }

    #[test]
    fn test_diesel_truck_categories() {
        let fx = fixture();
        let (_, aggregation) = run(&fx);
        let results = &aggregation.results;
        let diesel = cell(&fx, Powertrain::IcevD);
        let cargo_t = CARGO_KG / 1000.0;
        let fuel_kg = TTW_KJ_PER_KM / 1000.0 / FuelType::Diesel.lhv_mj_per_kg() / cargo_t;
        let trucks = 1.0 / (LIFETIME_KM * cargo_t);

        let exhaust = results.get(0, diesel, ResultCategory::DirectExhaust, 0);
        assert!(close(exhaust, fuel_kg * FuelType::Diesel.co2_kg_per_kg()));
        let glider = results.get(0, diesel, ResultCategory::Glider, 1);
        assert!(close(glider, trucks * GLIDER_KG * 2.0 * 1.5));
        let chain = results.get(0, diesel, ResultCategory::EnergyChain, 0);
        assert!(close(chain, fuel_kg * 0.5));
        assert_eq!(results.get(0, diesel, ResultCategory::EnergyStorage, 0), 0.0);
    }

    #[test]
    fn test_single_technology_mix_drives_electricity_impacts() {
        let fx = fixture();
        let (_, aggregation) = run(&fx);
        let results = &aggregation.results;
        let bev = cell(&fx, Powertrain::Bev);
        let cargo_t = CARGO_KG / 1000.0;
        let trucks = 1.0 / (LIFETIME_KM * cargo_t);

        assert_eq!(results.get(0, bev, ResultCategory::DirectExhaust, 0), 0.0);
        let chain = results.get(0, bev, ResultCategory::EnergyChain, 0);
        assert!(close(chain, 1.2 / cargo_t * HYDRO_GWP));
        let storage = results.get(0, bev, ResultCategory::EnergyStorage, 0);
        assert!(close(
            storage,
            trucks * BATTERY_CELL_KG * CELL_KWH_PER_KG * HYDRO_GWP
        ));
    }

    #[test]
    fn test_unclaimed_first_tier_reported() {
        let fx = fixture();
        let solved = solve(&fx);
        let mut membership = CategoryMembership::new();
        membership.claim(FRAME, ResultCategory::Glider);
        let projector = ImpactProjector::new(&fx.impacts, YearMode::Static, fx.registry.len());
        let aggregation =
            aggregate(&solved.requirements, &fx.params, &projector, &membership).unwrap();

        let market = fx
            .registry
            .procedural(&ProceduralActivity::FuelMarket {
                family: FuelFamily::Diesel,
                year: 2020,
            })
            .unwrap();
        assert!(aggregation.unclaimed.contains(&market));
        assert!(!aggregation.unclaimed.contains(&FRAME));
        let diesel = cell(&fx, Powertrain::IcevD);
        assert_eq!(
            aggregation.results.get(0, diesel, ResultCategory::EnergyChain, 0),
            0.0
        );
    }

    #[test]
    fn test_first_claim_wins() {
        let mut membership = CategoryMembership::new();
        assert!(membership.claim(7, ResultCategory::Road));
        assert!(membership.claim(7, ResultCategory::Road));
        assert!(!membership.claim(7, ResultCategory::Glider));
        assert_eq!(membership.category_of(7), Some(ResultCategory::Road));
        assert_eq!(membership.members(ResultCategory::Road), vec![7]);
        assert_eq!(membership.unclaimed(&[3, 7]), vec![3]);
    }

    #[test]
    fn test_split_table_claims_matching_activities() {
        let fx = fixture();
        let mut membership = CategoryMembership::new();
        let rules = vec![
            SplitRule {
                category: ResultCategory::Glider,
                name_contains: "steel production".to_string(),
                location_contains: None,
            },
            SplitRule {
                category: ResultCategory::DirectExhaust,
                name_contains: "Carbon dioxide".to_string(),
                location_contains: Some("air".to_string()),
            },
            SplitRule {
                category: ResultCategory::Road,
                name_contains: "bitumen".to_string(),
                location_contains: None,
            },
        ];
        membership.apply_split_table(&fx.registry, &rules);
        assert_eq!(membership.category_of(STEEL), Some(ResultCategory::Glider));
        assert_eq!(
            membership.members(ResultCategory::DirectExhaust),
            vec![CO2_FOSSIL, CO2_NON_FOSSIL]
        );
        assert!(membership.members(ResultCategory::Road).is_empty());
    }
}
