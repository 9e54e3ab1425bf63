//! Small background system shared by the service tests

use std::collections::HashMap;

use ndarray::Array3;
use truck_lci_types::{FuelFamily, FuelType, Powertrain, Size};

use crate::model::parameters::names;
use crate::model::{
    ActivityKey, ActivityRegistry, BaseMatrix, ElectricityBackground, ElectricityConsumer,
    ElectricityMix, ElectricitySource, ElectricityTechnology, FuelBlendSpec, FuelBlends,
    ImpactMatrix, Requirements, TechnologyMatrix, VehicleParameters,
};
use crate::service::impact_projector::CategoryMembership;
use crate::service::market_mixer::{register_markets, MarketMixer};
use crate::service::matrix_builder::TechnologyMatrixBuilder;
use crate::service::solver::solve_requirements;
use crate::service::vehicle_inventory::{InventoryReport, VehicleColumns, VehicleInventory};

pub const FRAME: usize = 0;
pub const DIESEL: usize = 1;
pub const CO2_FOSSIL: usize = 2;
pub const CO2_NON_FOSSIL: usize = 3;
pub const STEEL: usize = 4;
pub const HYDRO: usize = 5;

pub const YEARS: [u16; 1] = [2020];
pub const GLIDER_KG: f64 = 5000.0;
pub const CARGO_KG: f64 = 20_000.0;
pub const LIFETIME_KM: f64 = 1_000_000.0;
pub const TTW_KJ_PER_KM: f64 = 10_000.0;
pub const BATTERY_CELL_KG: f64 = 3000.0;
pub const CELL_KWH_PER_KG: f64 = 20.0;

/// kg CO2-eq per kWh of run-of-river electricity
pub const HYDRO_GWP: f64 = 0.01;

pub struct Fixture {
    pub registry: ActivityRegistry,
    pub params: VehicleParameters,
    pub columns: VehicleColumns,
    pub blends: FuelBlends,
    pub background: ElectricityBackground,
    pub electricity: ElectricitySource,
    pub base: BaseMatrix,
    pub impacts: ImpactMatrix,
}

pub struct Solved {
    pub matrix: TechnologyMatrix,
    pub requirements: Requirements,
    pub membership: CategoryMembership,
    pub report: InventoryReport,
}

fn reference_registry() -> ActivityRegistry {
    let keys = [
        ActivityKey::new("frame, blanks and saddle, for lorry", "RER", "kilogram", "frame"),
        ActivityKey::new("market for diesel, low-sulfur", "RER", "kilogram", "diesel, low-sulfur"),
        ActivityKey::flow("Carbon dioxide, fossil", "air", "kilogram"),
        ActivityKey::flow("Carbon dioxide, non-fossil", "air", "kilogram"),
        ActivityKey::new("steel production, low-alloyed", "RER", "kilogram", "steel"),
        ActivityKey::new(
            ElectricityTechnology::Hydro.dataset_name(),
            "CH",
            "kilowatt hour",
            "electricity, high voltage",
        ),
    ];
    let mut registry = ActivityRegistry::new();
    for (idx, key) in keys.into_iter().enumerate() {
        registry.insert(key, idx).unwrap();
    }
    registry
}

fn parameters() -> VehicleParameters {
    let mut params = VehicleParameters::new(
        names::required(),
        vec![Size::T40],
        vec![Powertrain::IcevD, Powertrain::Bev],
        YEARS.to_vec(),
        2,
    );
    params.fill(names::GLIDER_BASE_MASS, GLIDER_KG).unwrap();
    params.fill(names::TOTAL_CARGO_MASS, CARGO_KG).unwrap();
    params.fill(names::LIFETIME_KILOMETERS, LIFETIME_KM).unwrap();
    params.fill(names::KILOMETERS_PER_YEAR, 100_000.0).unwrap();
    params.fill(names::ELECTRIC_ENERGY_STORED, 500.0).unwrap();
    params.fill(names::BATTERY_CELL_PRODUCTION_ELECTRICITY, CELL_KWH_PER_KG).unwrap();

    let diesel = params.cell_of(Size::T40, Powertrain::IcevD, 2020).unwrap();
    let bev = params.cell_of(Size::T40, Powertrain::Bev, 2020).unwrap();
    params.fill_cell(names::TTW_ENERGY, diesel, TTW_KJ_PER_KM).unwrap();
    params.fill_cell(names::ELECTRICITY_CONSUMPTION, bev, 1.2).unwrap();
    params.fill_cell(names::BATTERY_CELL_MASS, bev, BATTERY_CELL_KG).unwrap();
    params
}

fn single(technology: ElectricityTechnology) -> Vec<f64> {
    let mut row = vec![0.0; ElectricityTechnology::COUNT];
    row[technology.position()] = 1.0;
    row
}

/// One 40 t diesel truck and one 40 t battery truck over a steel and diesel
/// background, charged with pure run-of-river electricity
pub fn fixture() -> Fixture {
    let mut registry = reference_registry();
    let params = parameters();
    let columns = VehicleColumns::register(&mut registry, &params, "RER");
    register_markets(&mut registry, params.powertrains(), params.years(), "RER");

    let specs = HashMap::from([(
        FuelFamily::Diesel,
        FuelBlendSpec {
            primary: FuelType::Diesel,
            primary_share: vec![1.0],
            secondary: None,
        },
    )]);
    let blends = FuelBlends::resolve(&specs, &YEARS, None).unwrap();

    let base = BaseMatrix::with_entries(
        6,
        vec![
            (STEEL, FRAME, -2.0),
            (CO2_FOSSIL, STEEL, -1.5),
            (CO2_FOSSIL, DIESEL, -0.5),
        ],
    )
    .unwrap();

    let mut factors = Array3::zeros((1, 1, 6));
    factors[[0, 0, CO2_FOSSIL]] = 1.0;
    factors[[0, 0, CO2_NON_FOSSIL]] = 1.0;
    factors[[0, 0, HYDRO]] = HYDRO_GWP;
    let impacts = ImpactMatrix::new(
        "IPCC 2021",
        YEARS.to_vec(),
        vec!["climate change".to_string()],
        factors,
    )
    .unwrap();

    let mix = ElectricityMix::custom(&YEARS, &[single(ElectricityTechnology::Hydro)]).unwrap();

    Fixture {
        registry,
        params,
        columns,
        blends,
        background: ElectricityBackground::default(),
        electricity: ElectricitySource::Custom(mix),
        base,
        impacts,
    }
}

/// Build, solve and classify the fixture's technology matrix
pub fn solve(fx: &Fixture) -> Solved {
    let mut builder =
        TechnologyMatrixBuilder::from_base(&fx.base, fx.registry.len(), fx.params.samples())
            .unwrap();
    let report = VehicleInventory::new(&fx.registry, &fx.params, &fx.columns, &fx.blends)
        .unwrap()
        .inject(&mut builder)
        .unwrap();

    let mut mixer = MarketMixer::new(&fx.registry, &fx.background, "CH");
    for consumer in ElectricityConsumer::ALL {
        mixer
            .mix_electricity(&mut builder, consumer, &fx.electricity, fx.params.years())
            .unwrap();
    }
    for blend in fx.blends.iter() {
        mixer.mix_fuel(&mut builder, blend).unwrap();
    }
    let market_assignments = mixer.into_assignments();

    let (matrix, diagnostics) = builder.finish().unwrap();
    assert!(diagnostics.is_empty());
    let requirements = solve_requirements(&matrix, &fx.columns).unwrap();

    let mut membership = CategoryMembership::new();
    membership.claim_all(&report.assignments);
    membership.claim_all(&market_assignments);

    Solved {
        matrix,
        requirements,
        membership,
        report,
    }
}
