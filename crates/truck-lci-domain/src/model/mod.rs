//! Domain model types

pub mod activity;
pub mod electricity;
pub mod fuel_blend;
pub mod impact;
pub mod interpolation;
pub mod matrix;
pub mod parameters;
pub mod registry;
pub mod results;

pub use activity::{ActivityKey, MatchMode, ProceduralActivity, Selector};
pub use electricity::{
    ElectricityBackground, ElectricityConsumer, ElectricityMix, ElectricitySource,
    ElectricityTechnology, MixTable,
};
pub use fuel_blend::{BiofuelShares, FuelBlend, FuelBlendSpec, FuelBlends};
pub use impact::{ImpactMatrix, SplitRule, YearMode};
pub use matrix::{BaseMatrix, CoercionDiagnostic, TechnologyMatrix};
pub use parameters::{ParamId, ParameterOverride, VehicleCell, VehicleParameters};
pub use registry::ActivityRegistry;
pub use results::{Requirements, ResultArray, ResultRecord, VehicleRequirement};
