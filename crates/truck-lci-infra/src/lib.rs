//! Infrastructure layer - reference data loaders and file repositories

pub mod csv_loader;
pub mod persistence;

pub use csv_loader::CsvLoaderError;
pub use persistence::{FileReferenceDataRepository, FileVehicleParameterRepository};
