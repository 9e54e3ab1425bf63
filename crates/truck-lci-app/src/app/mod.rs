//! Use cases

pub mod calculation_service;

pub use calculation_service::{
    calculate, CalculationOptions, CalculationOutput, Progress, ProgressCallback,
};
