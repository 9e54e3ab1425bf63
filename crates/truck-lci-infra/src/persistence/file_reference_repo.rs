//! File-based implementation of ReferenceDataRepository

use std::path::{Path, PathBuf};

use truck_lci_domain::model::{
    ActivityRegistry, BaseMatrix, BiofuelShares, ElectricityBackground, ImpactMatrix, SplitRule,
};
use truck_lci_domain::repository::ReferenceDataRepository;
use truck_lci_types::Error;

use crate::csv_loader;

const ACTIVITIES: &str = "activities.csv";
const TECHNOLOGY_MATRIX: &str = "technology_matrix.csv";
const IMPACTS_DIR: &str = "impacts";
const SPLIT_TABLE: &str = "split_table.csv";
const ELECTRICITY_MIX: &str = "electricity_mix.csv";
const ELECTRICITY_LOSSES: &str = "electricity_losses.csv";
const REGIONS: &str = "regions.csv";
const BIOFUEL_SHARE: &str = "biofuel_share.csv";

/// Reference data read from a directory of semicolon-delimited tables
pub struct FileReferenceDataRepository {
    data_dir: PathBuf,
}

impl FileReferenceDataRepository {
    /// Open a data directory. Files are read lazily, on each request.
    pub fn open(data_dir: PathBuf) -> Result<Self, Error> {
        if !data_dir.is_dir() {
            return Err(Error::FileNotFound(data_dir.display().to_string()));
        }
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Reference years available for a method and scenario
    pub fn impact_years(&self, method: &str, scenario: &str) -> Result<Vec<u16>, Error> {
        Ok(csv_loader::impact_files(&self.file(IMPACTS_DIR), method, scenario)?
            .into_keys()
            .collect())
    }
}

impl ReferenceDataRepository for FileReferenceDataRepository {
    fn activities(&self) -> Result<ActivityRegistry, Error> {
        csv_loader::load_activities(&self.file(ACTIVITIES))
    }

    fn technology_matrix(&self, dimension: usize) -> Result<BaseMatrix, Error> {
        csv_loader::load_technology_matrix(&self.file(TECHNOLOGY_MATRIX), dimension)
    }

    fn impact_matrix(&self, method: &str, scenario: &str) -> Result<ImpactMatrix, Error> {
        let width = self.activities()?.len();
        csv_loader::load_impact_matrix(&self.file(IMPACTS_DIR), method, scenario, width)
    }

    fn split_table(&self) -> Result<Vec<SplitRule>, Error> {
        csv_loader::load_split_table(&self.file(SPLIT_TABLE))
    }

    fn electricity(&self) -> Result<ElectricityBackground, Error> {
        csv_loader::load_electricity(
            &self.file(ELECTRICITY_MIX),
            &self.file(ELECTRICITY_LOSSES),
            &self.file(REGIONS),
        )
    }

    fn biofuel_shares(&self) -> Result<BiofuelShares, Error> {
        csv_loader::load_biofuel_shares(&self.file(BIOFUEL_SHARE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn data_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(ACTIVITIES),
            "index;name;location;unit;reference product\n\
             0;steel production;RER;kilogram;steel\n\
             1;Carbon dioxide, fossil;air;kilogram;\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(TECHNOLOGY_MATRIX),
            "row;column;value\n1;0;-1.8\n",
        )
        .unwrap();
        fs::create_dir(dir.path().join(IMPACTS_DIR)).unwrap();
        fs::write(
            dir.path().join(IMPACTS_DIR).join("IPCC_none_2020.csv"),
            "category;activity;value\nclimate change;1;1\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_open_requires_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nowhere");
        assert!(matches!(
            FileReferenceDataRepository::open(missing),
            Err(Error::FileNotFound(_))
        ));
    }

    #[test]
    fn test_reads_reference_tables() {
        let dir = data_dir();
        let repo = FileReferenceDataRepository::open(dir.path().to_path_buf()).unwrap();

        let registry = repo.activities().unwrap();
        assert_eq!(registry.len(), 2);
        let base = repo.technology_matrix(registry.len()).unwrap();
        assert_eq!(base.entries(), &[(1, 0, -1.8)]);
        let impacts = repo.impact_matrix("IPCC", "none").unwrap();
        assert_eq!(impacts.width(), 2);
        assert_eq!(repo.impact_years("IPCC", "none").unwrap(), vec![2020]);
        assert!(repo.biofuel_shares().unwrap().shares_for("RER", &[2020]).is_none());
    }

    #[test]
    fn test_missing_required_file_named() {
        let dir = data_dir();
        let repo = FileReferenceDataRepository::open(dir.path().to_path_buf()).unwrap();
        match repo.split_table() {
            Err(Error::FileNotFound(path)) => assert!(path.ends_with(SPLIT_TABLE)),
            other => panic!("unexpected {:?}", other),
        }
    }
}
