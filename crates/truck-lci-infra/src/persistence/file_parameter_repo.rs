//! File-based implementation of VehicleParameterRepository

use std::path::{Path, PathBuf};

use truck_lci_domain::model::VehicleParameters;
use truck_lci_domain::repository::VehicleParameterRepository;
use truck_lci_types::Error;

use crate::csv_loader::load_vehicle_parameters;

/// Vehicle Parameter Array read from a long-form CSV file
pub struct FileVehicleParameterRepository {
    path: PathBuf,
}

impl FileVehicleParameterRepository {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VehicleParameterRepository for FileVehicleParameterRepository {
    fn load(&self) -> Result<VehicleParameters, Error> {
        load_vehicle_parameters(&self.path)
    }
}
