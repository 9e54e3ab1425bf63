//! Repository trait definitions for reference data

use truck_lci_types::Error;

use crate::model::{
    ActivityRegistry, BaseMatrix, BiofuelShares, ElectricityBackground, ImpactMatrix, SplitRule,
    VehicleParameters,
};

/// Source of the background system a calculation runs against
pub trait ReferenceDataRepository {
    /// Activity label dictionary, densely indexed
    fn activities(&self) -> Result<ActivityRegistry, Error>;

    /// Base technology exchanges over the first `dimension` activities
    fn technology_matrix(&self, dimension: usize) -> Result<BaseMatrix, Error>;

    /// Characterization factors for one method and scenario, over all reference years
    fn impact_matrix(&self, method: &str, scenario: &str) -> Result<ImpactMatrix, Error>;

    /// Rules assigning reference activities to result categories
    fn split_table(&self) -> Result<Vec<SplitRule>, Error>;

    /// Electricity mixes, grid losses and regions
    fn electricity(&self) -> Result<ElectricityBackground, Error>;

    /// Regional biofuel shares; empty when none are published
    fn biofuel_shares(&self) -> Result<BiofuelShares, Error>;
}

/// Source of the Vehicle Parameter Array
pub trait VehicleParameterRepository {
    fn load(&self) -> Result<VehicleParameters, Error>;
}
