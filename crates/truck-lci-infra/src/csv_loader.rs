//! Loaders for the semicolon-delimited reference tables
//!
//! Every table has a header row; column names are matched exactly after
//! trimming.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use truck_lci_domain::model::{
    ActivityKey, ActivityRegistry, BaseMatrix, BiofuelShares, ElectricityBackground,
    ElectricityTechnology, ImpactMatrix, MixTable, SplitRule, VehicleParameters,
};
use truck_lci_types::{ConfigError, Error, Powertrain, ResultCategory, Size};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CsvLoaderError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid number format in row {row}, column {column}: {value}")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Invalid value in row {row}: {message}")]
    InvalidValue { row: usize, message: String },

    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

impl From<CsvLoaderError> for Error {
    fn from(err: CsvLoaderError) -> Self {
        match err {
            CsvLoaderError::NotFound(path) => Error::FileNotFound(path.display().to_string()),
            CsvLoaderError::IoError(e) => Error::Io(e),
            other => Error::ReferenceData(other.to_string()),
        }
    }
}

fn open(path: &Path) -> Result<csv::Reader<File>, CsvLoaderError> {
    if !path.exists() {
        return Err(CsvLoaderError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn validate_headers(headers: &csv::StringRecord, required: &[&str]) -> Result<(), CsvLoaderError> {
    for col in required {
        if !headers.iter().any(|h| h == *col) {
            return Err(CsvLoaderError::MissingColumn(col.to_string()));
        }
    }
    Ok(())
}

/// Deserialize every record, paired with its 1-based line number
fn read_rows<T: DeserializeOwned>(
    path: &Path,
    required: &[&str],
) -> Result<Vec<(usize, T)>, CsvLoaderError> {
    let mut reader = open(path)?;
    let headers = reader.headers()?.clone();
    validate_headers(&headers, required)?;

    let mut rows = Vec::new();
    for (row_idx, result) in reader.deserialize().enumerate() {
        // header is line 1
        rows.push((row_idx + 2, result?));
    }
    Ok(rows)
}

fn parse_f64(s: &str, row: usize, column: &str) -> Result<f64, CsvLoaderError> {
    let cleaned = s.trim();
    if cleaned.is_empty() {
        return Ok(0.0);
    }
    cleaned.parse().map_err(|_| CsvLoaderError::InvalidNumber {
        row,
        column: column.to_string(),
        value: s.to_string(),
    })
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct ActivityRow {
    index: usize,
    name: String,
    location: String,
    unit: String,
    #[serde(rename = "reference product", default)]
    reference_product: Option<String>,
}

/// Load the activity label dictionary.
///
/// An empty reference product marks an elementary flow. Indices must be
/// unique and dense.
pub fn load_activities(path: &Path) -> Result<ActivityRegistry, Error> {
    let rows: Vec<(usize, ActivityRow)> = read_rows(
        path,
        &["index", "name", "location", "unit", "reference product"],
    )?;
    let mut registry = ActivityRegistry::new();
    for (_, row) in rows {
        let key = match non_empty(row.reference_product) {
            Some(product) => ActivityKey::new(&row.name, &row.location, &row.unit, &product),
            None => ActivityKey::flow(&row.name, &row.location, &row.unit),
        };
        registry.insert(key, row.index)?;
    }
    registry.ensure_dense()?;
    debug!(activities = registry.len(), path = %path.display(), "activity dictionary loaded");
    Ok(registry)
}

#[derive(Debug, Deserialize)]
struct CoordinateRow {
    row: usize,
    column: usize,
    value: f64,
}

/// Load the base technology exchanges as a coordinate table
pub fn load_technology_matrix(path: &Path, dimension: usize) -> Result<BaseMatrix, Error> {
    let rows: Vec<(usize, CoordinateRow)> = read_rows(path, &["row", "column", "value"])?;
    let mut base = BaseMatrix::new(dimension);
    for (_, entry) in rows {
        base.push(entry.row, entry.column, entry.value)?;
    }
    debug!(entries = base.entries().len(), dimension, "technology matrix loaded");
    Ok(base)
}

#[derive(Debug, Deserialize)]
struct ImpactRow {
    category: String,
    activity: usize,
    value: f64,
}

/// Reference years available for `method` and `scenario` in `dir`, from
/// file names of the form `<method>_<scenario>_<year>.csv`
pub fn impact_files(dir: &Path, method: &str, scenario: &str) -> Result<BTreeMap<u16, PathBuf>, Error> {
    if !dir.is_dir() {
        return Err(Error::FileNotFound(dir.display().to_string()));
    }
    let prefix = format!("{}_{}_", method, scenario);
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let name = entry.file_name().to_string_lossy();
        let Some(year) = name
            .strip_suffix(".csv")
            .and_then(|stem| stem.strip_prefix(prefix.as_str()))
        else {
            continue;
        };
        match year.parse::<u16>() {
            Ok(year) => {
                files.insert(year, entry.path().to_path_buf());
            }
            Err(_) => warn!(file = %name, "impact file without a year suffix, skipped"),
        }
    }
    Ok(files)
}

/// Load the characterization factors of one method and scenario over all
/// reference years. `width` is the number of dictionary activities.
pub fn load_impact_matrix(
    dir: &Path,
    method: &str,
    scenario: &str,
    width: usize,
) -> Result<ImpactMatrix, Error> {
    let files = impact_files(dir, method, scenario)?;
    if files.is_empty() {
        return Err(ConfigError::UnknownMethod(format!("{} ({})", method, scenario)).into());
    }

    let mut tables = Vec::with_capacity(files.len());
    let mut categories: Vec<String> = Vec::new();
    for path in files.values() {
        let rows: Vec<(usize, ImpactRow)> = read_rows(path, &["category", "activity", "value"])?;
        for (_, row) in &rows {
            if !categories.contains(&row.category) {
                categories.push(row.category.clone());
            }
        }
        tables.push(rows);
    }

    let mut values = Array3::zeros((files.len(), categories.len(), width));
    for (yi, rows) in tables.into_iter().enumerate() {
        for (line, row) in rows {
            if row.activity >= width {
                return Err(Error::DimensionMismatch(format!(
                    "impact factor on line {} names activity {}, dictionary has {}",
                    line, row.activity, width
                )));
            }
            let ci = categories
                .iter()
                .position(|c| *c == row.category)
                .unwrap_or_default();
            values[[yi, ci, row.activity]] = row.value;
        }
    }
    debug!(
        method,
        scenario,
        years = files.len(),
        categories = categories.len(),
        "impact matrix loaded"
    );
    ImpactMatrix::new(method, files.keys().copied().collect(), categories, values)
}

#[derive(Debug, Deserialize)]
struct SplitRow {
    #[serde(rename = "result category")]
    category: String,
    #[serde(rename = "name contains")]
    name_contains: String,
    #[serde(rename = "location contains", default)]
    location_contains: Option<String>,
}

/// Load the split table. Rows naming an unknown result category are skipped.
pub fn load_split_table(path: &Path) -> Result<Vec<SplitRule>, Error> {
    let rows: Vec<(usize, SplitRow)> = read_rows(
        path,
        &["result category", "name contains", "location contains"],
    )?;
    let mut rules = Vec::with_capacity(rows.len());
    for (line, row) in rows {
        let category = match row.category.parse::<ResultCategory>() {
            Ok(c) => c,
            Err(e) => {
                warn!(line, error = %e, "split rule skipped");
                continue;
            }
        };
        rules.push(SplitRule {
            category,
            name_contains: row.name_contains,
            location_contains: non_empty(row.location_contains),
        });
    }
    Ok(rules)
}

/// Load per-country mix tables: `country;year;<one column per technology>`
pub fn load_electricity_mixes(path: &Path) -> Result<BTreeMap<String, MixTable>, Error> {
    let mut reader = open(path)?;
    let headers = reader.headers().map_err(CsvLoaderError::from)?.clone();
    validate_headers(&headers, &["country", "year"])?;
    let column = |label: &str| {
        headers
            .iter()
            .position(|h| h == label)
            .ok_or_else(|| CsvLoaderError::MissingColumn(label.to_string()))
    };
    let country_col = column("country")?;
    let year_col = column("year")?;
    let tech_cols = ElectricityTechnology::ALL
        .iter()
        .map(|t| column(t.label()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut grouped: BTreeMap<String, BTreeMap<u16, Vec<f64>>> = BTreeMap::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(CsvLoaderError::from)?;
        let row = row_idx + 2;
        let country = record.get(country_col).unwrap_or("").to_string();
        let year_str = record.get(year_col).unwrap_or("");
        let year: u16 = year_str.parse().map_err(|_| CsvLoaderError::InvalidNumber {
            row,
            column: "year".to_string(),
            value: year_str.to_string(),
        })?;
        let shares = ElectricityTechnology::ALL
            .iter()
            .zip(&tech_cols)
            .map(|(t, &col)| parse_f64(record.get(col).unwrap_or(""), row, t.label()))
            .collect::<Result<Vec<_>, _>>()?;
        grouped.entry(country).or_default().insert(year, shares);
    }

    let mut tables = BTreeMap::new();
    for (country, by_year) in grouped {
        let years: Vec<u16> = by_year.keys().copied().collect();
        let flat: Vec<f64> = by_year.into_values().flatten().collect();
        let shares = Array2::from_shape_vec((years.len(), ElectricityTechnology::COUNT), flat)
            .map_err(|e| Error::DimensionMismatch(e.to_string()))?;
        tables.insert(country, MixTable::new(years, shares)?);
    }
    debug!(countries = tables.len(), "electricity mixes loaded");
    Ok(tables)
}

#[derive(Debug, Deserialize)]
struct LossRow {
    country: String,
    #[serde(rename = "loss factor")]
    loss_factor: f64,
}

#[derive(Debug, Deserialize)]
struct RegionRow {
    country: String,
    region: String,
}

/// Load mixes, grid losses and regions into one background
pub fn load_electricity(
    mix_path: &Path,
    loss_path: &Path,
    region_path: &Path,
) -> Result<ElectricityBackground, Error> {
    let mixes = load_electricity_mixes(mix_path)?;
    let losses: Vec<(usize, LossRow)> = read_rows(loss_path, &["country", "loss factor"])?;
    let regions: Vec<(usize, RegionRow)> = read_rows(region_path, &["country", "region"])?;
    for (line, row) in &losses {
        if row.loss_factor < 1.0 {
            warn!(line, country = %row.country, loss = row.loss_factor, "grid loss factor below 1");
        }
    }
    Ok(ElectricityBackground::new(
        mixes.into_iter().collect(),
        losses
            .into_iter()
            .map(|(_, r)| (r.country, r.loss_factor))
            .collect(),
        regions
            .into_iter()
            .map(|(_, r)| (r.country, r.region))
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
struct BiofuelRow {
    region: String,
    year: u16,
    share: f64,
}

/// Load regional biofuel shares; an absent file means no shares
pub fn load_biofuel_shares(path: &Path) -> Result<BiofuelShares, Error> {
    let mut shares = BiofuelShares::new();
    if !path.exists() {
        debug!(path = %path.display(), "no biofuel share table");
        return Ok(shares);
    }
    let rows: Vec<(usize, BiofuelRow)> = read_rows(path, &["region", "year", "share"])?;
    for (line, row) in rows {
        if !(0.0..=1.0).contains(&row.share) {
            return Err(CsvLoaderError::InvalidValue {
                row: line,
                message: format!("biofuel share {} outside [0, 1]", row.share),
            }
            .into());
        }
        shares.insert(&row.region, row.year, row.share);
    }
    Ok(shares)
}

#[derive(Debug, Deserialize)]
struct ParameterRow {
    parameter: String,
    size: String,
    powertrain: String,
    year: u16,
    sample: usize,
    value: f64,
}

/// Load a Vehicle Parameter Array from its long form
/// `parameter;size;powertrain;year;sample;value`.
///
/// Axes are built from the values present, in canonical order. Entries absent from the file are zero.
pub fn load_vehicle_parameters(path: &Path) -> Result<VehicleParameters, Error> {
    let rows: Vec<(usize, ParameterRow)> = read_rows(
        path,
        &["parameter", "size", "powertrain", "year", "sample", "value"],
    )?;

    let mut names: Vec<String> = Vec::new();
    let mut sizes = BTreeSet::new();
    let mut powertrains = BTreeSet::new();
    let mut years = BTreeSet::new();
    let mut samples = 0;
    let mut parsed = Vec::with_capacity(rows.len());
    for (line, row) in rows {
        let size: Size = row
            .size
            .parse()
            .map_err(|message| CsvLoaderError::InvalidValue { row: line, message })?;
        let powertrain: Powertrain = row
            .powertrain
            .parse()
            .map_err(|message| CsvLoaderError::InvalidValue { row: line, message })?;
        if !names.contains(&row.parameter) {
            names.push(row.parameter.clone());
        }
        sizes.insert(size);
        powertrains.insert(powertrain);
        years.insert(row.year);
        samples = samples.max(row.sample + 1);
        parsed.push((row.parameter, size, powertrain, row.year, row.sample, row.value));
    }

    let mut params = VehicleParameters::new(
        names,
        sizes.into_iter().collect(),
        powertrains.into_iter().collect(),
        years.into_iter().collect(),
        samples,
    );
    for (name, size, powertrain, year, sample, value) in parsed {
        let id = params.id(&name)?;
        let cell = params.cell_of(size, powertrain, year).ok_or_else(|| {
            Error::DimensionMismatch(format!("{} {} {} not on the parameter axes", size, powertrain, year))
        })?;
        params.set(id, cell, sample, value);
    }
    debug!(
        parameters = params.parameter_names().len(),
        vehicles = params.cells().count(),
        samples = params.samples(),
        "vehicle parameters loaded"
    );
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_activities_and_flows() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "activities.csv",
            "index;name;location;unit;reference product\n\
             1;Carbon dioxide, fossil;air;kilogram;\n\
             0;market for diesel, low-sulfur;RER;kilogram;diesel, low-sulfur\n",
        );
        let registry = load_activities(&path).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.key(1).unwrap().is_elementary());
        assert_eq!(registry.key(0).unwrap().location, "RER");
    }

    #[test]
    fn test_duplicate_activity_index_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "activities.csv",
            "index;name;location;unit;reference product\n\
             0;steel;RER;kilogram;steel\n\
             0;copper;RER;kilogram;copper\n",
        );
        assert!(matches!(
            load_activities(&path),
            Err(Error::DuplicateActivity { .. })
        ));
    }

    #[test]
    fn test_missing_file_and_column() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("technology_matrix.csv");
        assert!(matches!(
            load_technology_matrix(&missing, 3),
            Err(Error::FileNotFound(_))
        ));

        let path = write(&dir, "technology_matrix.csv", "row;value\n0;1.0\n");
        match load_technology_matrix(&path, 3) {
            Err(Error::ReferenceData(msg)) => assert!(msg.contains("column")),
            other => panic!("unexpected {:?}", other.map(|b| b.entries().len())),
        }
    }

    #[test]
    fn test_technology_matrix_bounds() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "technology_matrix.csv",
            "row;column;value\n1;0;-2.5\n2;1;NaN\n",
        );
        let base = load_technology_matrix(&path, 3).unwrap();
        assert_eq!(base.entries().len(), 2);
        assert!(base.entries()[1].2.is_nan());
        assert!(matches!(
            load_technology_matrix(&path, 2),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_impact_files_selected_by_name() {
        let dir = TempDir::new().unwrap();
        write(&dir, "impacts/recipe_SSP2-Base_2050.csv", "category;activity;value\nclimate change;0;0.5\n");
        write(
            &dir,
            "impacts/recipe_SSP2-Base_2020.csv",
            "category;activity;value\nclimate change;0;1.0\nozone depletion;1;2.0\n",
        );
        write(&dir, "impacts/recipe_SSP2-PkBudg500_2020.csv", "category;activity;value\n");
        let impacts_dir = dir.path().join("impacts");

        let impacts = load_impact_matrix(&impacts_dir, "recipe", "SSP2-Base", 2).unwrap();
        assert_eq!(impacts.reference_years(), &[2020, 2050]);
        assert_eq!(impacts.categories().len(), 2);
        let factors = impacts
            .at_year(2035, truck_lci_domain::model::YearMode::Interpolated, 2)
            .unwrap();
        assert!((factors[[0, 0]] - 0.75).abs() < 1e-12);

        assert!(matches!(
            load_impact_matrix(&impacts_dir, "ef", "SSP2-Base", 2),
            Err(Error::Config(ConfigError::UnknownMethod(_)))
        ));
    }

    #[test]
    fn test_split_table_skips_unknown_category() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "split_table.csv",
            "result category;name contains;location contains\n\
             road;market for road;\n\
             cabin;cab;\n\
             direct - exhaust;Carbon dioxide;air\n",
        );
        let rules = load_split_table(&path).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].category, ResultCategory::Road);
        assert_eq!(rules[0].location_contains, None);
        assert_eq!(rules[1].location_contains.as_deref(), Some("air"));
    }

    #[test]
    fn test_electricity_tables() {
        let dir = TempDir::new().unwrap();
        let labels: Vec<&str> = ElectricityTechnology::ALL.iter().map(|t| t.label()).collect();
        let mut mix = format!("country;year;{}\n", labels.join(";"));
        let mut hydro = vec!["0"; ElectricityTechnology::COUNT];
        hydro[0] = "1";
        let mut half = vec!["0"; ElectricityTechnology::COUNT];
        half[0] = "0.5";
        half[1] = "0.5";
        mix.push_str(&format!("CH;2030;{}\n", half.join(";")));
        mix.push_str(&format!("CH;2020;{}\n", hydro.join(";")));
        let mix_path = write(&dir, "electricity_mix.csv", &mix);
        let loss_path = write(&dir, "electricity_losses.csv", "country;loss factor\nCH;1.05\n");
        let region_path = write(&dir, "regions.csv", "country;region\nLI;CH\n");

        let background = load_electricity(&mix_path, &loss_path, &region_path).unwrap();
        assert_eq!(background.loss_factor("LI"), 1.05);
        let mix = background.mix_for("LI", &[2025]).unwrap();
        assert!((mix.share(2025, ElectricityTechnology::Hydro) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_mix_without_technology_column_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "electricity_mix.csv", "country;year;Hydro\nCH;2020;1\n");
        match load_electricity_mixes(&path) {
            Err(Error::ReferenceData(msg)) => assert!(msg.contains("Nuclear")),
            other => panic!("unexpected {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn test_biofuel_shares_optional() {
        let dir = TempDir::new().unwrap();
        let shares = load_biofuel_shares(&dir.path().join("biofuel_share.csv")).unwrap();
        assert!(shares.shares_for("RER", &[2020]).is_none());

        let path = write(&dir, "biofuel_share.csv", "region;year;share\nRER;2020;0.1\nRER;2050;0.4\n");
        let shares = load_biofuel_shares(&path).unwrap();
        let at = shares.shares_for("RER", &[2030]).unwrap();
        assert!((at[0] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_vehicle_parameters_long_form() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "vehicle_parameters.csv",
            "parameter;size;powertrain;year;sample;value\n\
             gross mass;40t;BEV;2020;0;40000\n\
             gross mass;18t;ICEV-d;2020;1;18000\n\
             total cargo mass;40t;BEV;2030;0;20000\n",
        );
        let params = load_vehicle_parameters(&path).unwrap();
        assert_eq!(params.sizes(), &[Size::T18, Size::T40]);
        assert_eq!(params.powertrains(), &[Powertrain::IcevD, Powertrain::Bev]);
        assert_eq!(params.years(), &[2020, 2030]);
        assert_eq!(params.samples(), 2);

        let id = params.id("gross mass").unwrap();
        let cell = params.cell_of(Size::T18, Powertrain::IcevD, 2020).unwrap();
        assert_eq!(params.value(id, cell, 1), 18000.0);
        assert_eq!(params.value(id, cell, 0), 0.0);
    }

    #[test]
    fn test_vehicle_parameters_unknown_size() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "vehicle_parameters.csv",
            "parameter;size;powertrain;year;sample;value\ngross mass;70t;BEV;2020;0;1\n",
        );
        assert!(matches!(
            load_vehicle_parameters(&path),
            Err(Error::ReferenceData(_))
        ));
    }
}
