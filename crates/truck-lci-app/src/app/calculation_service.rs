//! Calculation Service - Core Use Case for truck life-cycle inventories
//!
//! This service orchestrates the complete calculation workflow:
//! 1. Load reference data into a fresh activity registry
//! 2. Register vehicle and market activities for the scope
//! 3. Resolve fuel blends
//! 4. Write vehicle exchanges and fill the markets
//! 5. Solve the technology matrix per sample
//! 6. Aggregate impacts into result categories
//! 7. Apply the functional unit and the compliance mask

use std::collections::HashMap;

use ndarray::Array4;
use tracing::{debug, info};
use truck_lci_domain::model::{
    ActivityKey, CoercionDiagnostic, ElectricityConsumer, ElectricityMix, ElectricitySource,
    FuelBlendSpec, FuelBlends, Requirements, ResultArray, VehicleParameters, YearMode,
};
use truck_lci_domain::repository::ReferenceDataRepository;
use truck_lci_domain::service::{
    aggregate, cargo_tonnes, is_compliant, register_markets, solve_requirements_with_progress,
    CategoryMembership, ImpactProjector, MarketMixer, TechnologyMatrixBuilder, VehicleColumns,
    VehicleInventory, DEFAULT_COMPLIANCE_THRESHOLD_KG,
};
use truck_lci_types::{FuelFamily, FunctionalUnit, Result};

use crate::config::Config;

/// Progress notifications emitted while calculating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Phase(&'static str),
    Sample { done: usize, total: usize },
}

pub type ProgressCallback = Box<dyn Fn(Progress) + Send>;

/// Options for a calculation
#[derive(Debug, Clone)]
pub struct CalculationOptions {
    pub method: String,
    pub scenario: String,
    pub year_mode: YearMode,
    pub functional_unit: FunctionalUnit,

    /// Grid country; also the location of generated activities
    pub country: String,

    pub compliance_threshold_kg: f64,
    pub fuel_blends: HashMap<FuelFamily, FuelBlendSpec>,

    /// Consumers listed here use a custom mix instead of the country mix
    pub custom_mixes: HashMap<ElectricityConsumer, ElectricityMix>,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            method: "recipe".to_string(),
            scenario: "SSP2-Base".to_string(),
            year_mode: YearMode::Interpolated,
            functional_unit: FunctionalUnit::Tkm,
            country: "CH".to_string(),
            compliance_threshold_kg: DEFAULT_COMPLIANCE_THRESHOLD_KG,
            fuel_blends: HashMap::new(),
            custom_mixes: HashMap::new(),
        }
    }
}

impl CalculationOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            method: config.method.clone(),
            scenario: config.scenario.clone(),
            year_mode: config.year_mode(),
            functional_unit: config.functional_unit,
            country: config.country.clone(),
            compliance_threshold_kg: config.compliance_threshold_kg,
            fuel_blends: config.fuel_blend_specs()?,
            custom_mixes: config.custom_mixes()?,
        })
    }

    pub fn with_method(mut self, method: &str, scenario: &str) -> Self {
        self.method = method.to_string();
        self.scenario = scenario.to_string();
        self
    }

    pub fn with_functional_unit(mut self, unit: FunctionalUnit) -> Self {
        self.functional_unit = unit;
        self
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = country.to_string();
        self
    }

    pub fn with_fuel_blend(mut self, family: FuelFamily, spec: FuelBlendSpec) -> Self {
        self.fuel_blends.insert(family, spec);
        self
    }

    pub fn with_custom_mix(mut self, consumer: ElectricityConsumer, mix: ElectricityMix) -> Self {
        self.custom_mixes.insert(consumer, mix);
        self
    }

    fn electricity_source(&self, consumer: ElectricityConsumer) -> ElectricitySource {
        match self.custom_mixes.get(&consumer) {
            Some(mix) => ElectricitySource::Custom(mix.clone()),
            None => ElectricitySource::Country(self.country.clone()),
        }
    }
}

/// Result of a calculation, with what was dropped or coerced on the way
#[derive(Debug, Clone)]
pub struct CalculationOutput {
    pub results: ResultArray,

    /// First-tier decomposition, for export adapters
    pub requirements: Requirements,

    /// {0, 1} per vehicle and sample, shaped (size, powertrain, year, sample)
    pub compliance: Array4<f64>,

    /// Non-finite matrix coefficients replaced by zero
    pub coercions: Vec<CoercionDiagnostic>,

    /// First-tier activities without result category
    pub unclaimed: Vec<ActivityKey>,

    /// Reference datasets the vehicle inventory could not find
    pub missing: Vec<String>,
}

/// Main entry point: calculate the impacts of every vehicle in `params`
///
/// # Arguments
/// * `repo` - Reference data source
/// * `params` - Vehicle Parameter Array
/// * `options` - Method, scenario, grid and fuel choices
/// * `progress` - Optional progress callback
pub fn calculate<R: ReferenceDataRepository>(
    repo: &R,
    params: &VehicleParameters,
    options: &CalculationOptions,
    progress: Option<ProgressCallback>,
) -> Result<CalculationOutput> {
    let report = |p: Progress| {
        if let Some(ref callback) = progress {
            callback(p);
        }
    };

    // Step 1: Reference data
    report(Progress::Phase("loading reference data"));
    let mut registry = repo.activities()?;
    let base = repo.technology_matrix(registry.len())?;
    let impacts = repo.impact_matrix(&options.method, &options.scenario)?;
    let split_table = repo.split_table()?;
    let background = repo.electricity()?;
    let biofuel = repo.biofuel_shares()?;

    // Step 2: Scope activities
    let columns = VehicleColumns::register(&mut registry, params, &options.country);
    register_markets(
        &mut registry,
        params.powertrains(),
        params.years(),
        &options.country,
    );
    debug!(activities = registry.len(), "activity registry complete");

    // Step 3: Fuel blends, with the country's or region's biofuel share
    let biofuel_share = biofuel.shares_for(&options.country, params.years()).or_else(|| {
        background
            .region_of(&options.country)
            .and_then(|region| biofuel.shares_for(region, params.years()))
    });
    let blends = FuelBlends::resolve(&options.fuel_blends, params.years(), biofuel_share.as_deref())?;

    // Step 4: Technology matrix
    report(Progress::Phase("building technology matrix"));
    let mut builder = TechnologyMatrixBuilder::from_base(&base, registry.len(), params.samples())?;
    let inventory = VehicleInventory::new(&registry, params, &columns, &blends)?.inject(&mut builder)?;

    let mut mixer = MarketMixer::new(&registry, &background, &options.country);
    for consumer in ElectricityConsumer::ALL {
        let source = options.electricity_source(consumer);
        mixer.mix_electricity(&mut builder, consumer, &source, params.years())?;
    }
    for blend in blends.iter() {
        mixer.mix_fuel(&mut builder, blend)?;
    }
    let market_assignments = mixer.into_assignments();
    let (matrix, coercions) = builder.finish()?;

    // Step 5: Solve
    report(Progress::Phase("solving"));
    let requirements = solve_requirements_with_progress(&matrix, &columns, |done, total| {
        report(Progress::Sample { done, total })
    })?;

    // Step 6: Aggregate
    report(Progress::Phase("aggregating impacts"));
    let mut membership = CategoryMembership::new();
    membership.claim_all(&inventory.assignments);
    membership.claim_all(&market_assignments);
    membership.apply_split_table(&registry, &split_table);
    let projector = ImpactProjector::new(&impacts, options.year_mode, registry.len());
    let aggregation = aggregate(&requirements, params, &projector, &membership)?;

    // Step 7: Functional unit and scope
    let mut results = aggregation.results;
    if options.functional_unit == FunctionalUnit::Vkm {
        results = results.to_vehicle_km(&cargo_tonnes(params)?);
    }
    let compliance = is_compliant(params, options.compliance_threshold_kg)?;
    let results = results.masked(&compliance);

    let unclaimed: Vec<ActivityKey> = aggregation
        .unclaimed
        .iter()
        .filter_map(|&idx| registry.key(idx).cloned())
        .collect();
    info!(
        vehicles = columns.len(),
        samples = params.samples(),
        coerced = coercions.len(),
        unclaimed = unclaimed.len(),
        missing = inventory.missing.len(),
        "calculation complete"
    );

    Ok(CalculationOutput {
        results,
        requirements,
        compliance,
        coercions,
        unclaimed,
        missing: inventory.missing,
    })
}
