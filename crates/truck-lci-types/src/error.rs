//! Error types for truck-lci

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("Unknown fuel type: {0}")]
    UnknownFuel(String),

    #[error("Fuel type '{fuel}' does not belong to the {family} family")]
    FuelFamilyMismatch { fuel: String, family: String },

    #[error("Primary and secondary fuel of the {0} blend are identical")]
    SameFuelTypes(String),

    #[error("Fuel blend for {family} has {found} yearly shares, expected {expected}")]
    ShareLength {
        family: String,
        expected: usize,
        found: usize,
    },

    #[error("Share {share} for the {family} blend is outside [0, 1]")]
    InvalidShare { family: String, share: f64 },

    #[error("Unknown impact method: {0}")]
    UnknownMethod(String),

    #[error("Invalid functional unit: {0} (expected 'tkm' or 'vkm')")]
    InvalidFunctionalUnit(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid reference data: {0}")]
    ReferenceData(String),

    #[error("Activity {key} already registered at index {existing}, refusing index {requested}")]
    DuplicateActivity {
        key: String,
        existing: usize,
        requested: usize,
    },

    #[error("Unknown activity: {0}")]
    UnknownActivity(String),

    #[error("Unknown vehicle parameter: {0}")]
    UnknownParameter(String),

    #[error("No electricity mix for country '{country}' or its region")]
    UnknownCountry { country: String },

    #[error("Invalid electricity mix: {0}")]
    InvalidMix(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Technology matrix is singular for sample {sample}")]
    SingularMatrix { sample: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
