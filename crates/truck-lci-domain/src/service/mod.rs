//! Domain services

pub mod compliance;
pub mod impact_projector;
pub mod market_mixer;
pub mod matrix_builder;
pub mod solver;
pub mod vehicle_inventory;

pub use compliance::{cargo_tonnes, is_compliant, DEFAULT_COMPLIANCE_THRESHOLD_KG};
pub use impact_projector::{aggregate, Aggregation, CategoryMembership, ImpactProjector};
pub use market_mixer::{fuel_dataset, register_markets, MarketMixer};
pub use matrix_builder::{InjectMode, TechnologyMatrixBuilder, VehicleTarget};
pub use solver::{
    first_tier, resolve, solve_requirements, solve_requirements_with_progress, SampleSolver,
};
pub use vehicle_inventory::{InventoryReport, VehicleColumn, VehicleColumns, VehicleInventory};

#[cfg(test)]
pub(crate) mod test_support;
