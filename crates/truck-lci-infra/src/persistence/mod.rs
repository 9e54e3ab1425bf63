//! Persistence implementations
//!
//! This module provides file-based implementations of the repository traits.

mod file_parameter_repo;
mod file_reference_repo;

pub use file_parameter_repo::FileVehicleParameterRepository;
pub use file_reference_repo::FileReferenceDataRepository;
