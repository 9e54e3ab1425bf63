//! Repository adapters for persistence layer

use std::path::PathBuf;

use tracing::warn;
use truck_lci_domain::model::VehicleParameters;
use truck_lci_domain::repository::VehicleParameterRepository;
use truck_lci_infra::{FileReferenceDataRepository, FileVehicleParameterRepository};
use truck_lci_types::Result;

use crate::config::Config;

/// Open file-based reference data repository
pub fn open_reference_repo(config: &Config) -> Result<FileReferenceDataRepository> {
    FileReferenceDataRepository::open(config.data_dir()?)
}

/// Open reference data repository at a custom directory
pub fn open_reference_repo_at(data_dir: PathBuf) -> Result<FileReferenceDataRepository> {
    FileReferenceDataRepository::open(data_dir)
}

/// Load vehicle parameters from CSV and apply the configured overrides.
///
/// When `years` is non-empty, only those years are kept.
pub fn load_parameters(config: &Config, csv_path: PathBuf, years: &[u16]) -> Result<VehicleParameters> {
    let mut params = FileVehicleParameterRepository::new(csv_path).load()?;
    if !years.is_empty() {
        params = params.select_years(years)?;
    }
    let applied = params.apply_overrides(&config.overrides);
    if applied < config.overrides.len() {
        warn!(
            applied,
            configured = config.overrides.len(),
            "some parameter overrides were skipped"
        );
    }
    Ok(params)
}
