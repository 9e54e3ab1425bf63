//! Configuration management for truck-lci
//!
//! Config stored at: ~/.config/truck-lci/config.toml

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use truck_lci_domain::model::{
    ElectricityConsumer, ElectricityMix, FuelBlendSpec, ParameterOverride, YearMode,
};
use truck_lci_domain::service::DEFAULT_COMPLIANCE_THRESHOLD_KG;
use truck_lci_types::{
    ConfigError, FuelFamily, FuelType, FunctionalUnit, OutputFormat, Result,
};

/// Blend of one fuel family as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelBlendConfig {
    /// Fuel type label, e.g. "diesel" or "biodiesel - cooking oil"
    pub primary: String,

    /// Share of the primary fuel, one per calculation year or a single value
    pub primary_share: Vec<f64>,

    #[serde(default)]
    pub secondary: Option<String>,
}

/// Caller-supplied electricity mix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMixConfig {
    pub years: Vec<u16>,

    /// One row per year, technology shares in mix-table column order
    pub shares: Vec<Vec<f64>>,

    /// Consumers supplied by this mix; every consumer when empty
    #[serde(default)]
    pub consumers: Vec<ElectricityConsumer>,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Reference data directory override
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Impact assessment method, as named in the impact file names
    #[serde(default = "default_method")]
    pub method: String,

    /// Background scenario, as named in the impact file names
    #[serde(default = "default_scenario")]
    pub scenario: String,

    /// Use the first reference year of the impact matrix for every year
    #[serde(default)]
    pub static_mode: bool,

    #[serde(default)]
    pub functional_unit: FunctionalUnit,

    /// Country whose grid supplies electricity
    #[serde(default = "default_country")]
    pub country: String,

    /// Vehicles carrying this much cargo or less are excluded, in kg
    #[serde(default = "default_compliance_threshold")]
    pub compliance_threshold_kg: f64,

    /// Default output format (json, table)
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Blends keyed by fuel family ("diesel", "cng", "hydrogen")
    #[serde(default)]
    pub fuel_blend: BTreeMap<String, FuelBlendConfig>,

    #[serde(default)]
    pub custom_electricity_mix: Option<CustomMixConfig>,

    /// Changes applied to the vehicle parameters before calculating
    #[serde(default)]
    pub overrides: Vec<ParameterOverride>,
}

fn default_method() -> String {
    "recipe".to_string()
}

fn default_scenario() -> String {
    "SSP2-Base".to_string()
}

fn default_country() -> String {
    "CH".to_string()
}

fn default_compliance_threshold() -> f64 {
    DEFAULT_COMPLIANCE_THRESHOLD_KG
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            method: default_method(),
            scenario: default_scenario(),
            static_mode: false,
            functional_unit: FunctionalUnit::default(),
            country: default_country(),
            compliance_threshold_kg: default_compliance_threshold(),
            output_format: OutputFormat::default(),
            fuel_blend: BTreeMap::new(),
            custom_electricity_mix: None,
            overrides: Vec::new(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("truck-lci");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the reference data directory
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or(ConfigError::NotFound)?
            .join("truck-lci");
        Ok(data_dir)
    }

    /// Load config from the default location, or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `path`, or create default when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that cannot describe a calculation
    pub fn validate(&self) -> Result<()> {
        if self.method.trim().is_empty() {
            return Err(ConfigError::UnknownMethod(self.method.clone()).into());
        }
        self.fuel_blend_specs()?;
        Ok(())
    }

    pub fn year_mode(&self) -> YearMode {
        if self.static_mode {
            YearMode::Static
        } else {
            YearMode::Interpolated
        }
    }

    /// Parsed fuel blends keyed by family
    pub fn fuel_blend_specs(&self) -> Result<HashMap<FuelFamily, FuelBlendSpec>> {
        let mut specs = HashMap::new();
        for (family_name, blend) in &self.fuel_blend {
            let family = FuelFamily::ALL
                .iter()
                .copied()
                .find(|f| f.label().eq_ignore_ascii_case(family_name.trim()))
                .ok_or_else(|| {
                    ConfigError::ParseError(format!("unknown fuel family '{}'", family_name))
                })?;
            let primary: FuelType = blend.primary.parse()?;
            let secondary = blend
                .secondary
                .as_deref()
                .map(str::parse::<FuelType>)
                .transpose()?;
            specs.insert(
                family,
                FuelBlendSpec {
                    primary,
                    primary_share: blend.primary_share.clone(),
                    secondary,
                },
            );
        }
        Ok(specs)
    }

    /// Custom mixes per consumer; consumers absent here use the country mix
    pub fn custom_mixes(&self) -> Result<HashMap<ElectricityConsumer, ElectricityMix>> {
        let Some(custom) = &self.custom_electricity_mix else {
            return Ok(HashMap::new());
        };
        let mix = ElectricityMix::custom(&custom.years, &custom.shares)?;
        let consumers: Vec<ElectricityConsumer> = if custom.consumers.is_empty() {
            ElectricityConsumer::ALL.to_vec()
        } else {
            custom.consumers.clone()
        };
        Ok(consumers.into_iter().map(|c| (c, mix.clone())).collect())
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Truck LCI Configuration")?;
        writeln!(f, "=======================")?;
        writeln!(f)?;
        writeln!(
            f,
            "Data dir:         {}",
            self.data_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "(error)".to_string())
        )?;
        writeln!(f, "Method:           {}", self.method)?;
        writeln!(f, "Scenario:         {}", self.scenario)?;
        writeln!(f, "Static mode:      {}", self.static_mode)?;
        writeln!(f, "Functional unit:  {}", self.functional_unit)?;
        writeln!(f, "Country:          {}", self.country)?;
        writeln!(f, "Cargo threshold:  {} kg", self.compliance_threshold_kg)?;
        writeln!(f, "Output format:    {}", self.output_format)?;
        for (family, blend) in &self.fuel_blend {
            writeln!(
                f,
                "Fuel blend:       {} = {} {:?} / {}",
                family,
                blend.primary,
                blend.primary_share,
                blend.secondary.as_deref().unwrap_or("(default)")
            )?;
        }
        if let Some(custom) = &self.custom_electricity_mix {
            writeln!(f, "Custom mix years: {:?}", custom.years)?;
        }
        if !self.overrides.is_empty() {
            writeln!(f, "Overrides:        {}", self.overrides.len())?;
        }

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:      {}", path.display())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use truck_lci_domain::model::ElectricityTechnology;
    use truck_lci_types::Error;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.method, "recipe");
        assert_eq!(config.functional_unit, FunctionalUnit::Tkm);
        assert_eq!(config.compliance_threshold_kg, 100.0);
        assert_eq!(config.year_mode(), YearMode::Interpolated);
    }

    #[test]
    fn test_fuel_blends_parsed() {
        let config = Config::parse(
            r#"
            functional_unit = "vkm"

            [fuel_blend.diesel]
            primary = "synthetic diesel"
            primary_share = [0.2, 0.4]

            [fuel_blend.hydrogen]
            primary = "smr - natural gas"
            primary_share = [1.0]
            secondary = "electrolysis"
            "#,
        )
        .unwrap();
        assert_eq!(config.functional_unit, FunctionalUnit::Vkm);
        let specs = config.fuel_blend_specs().unwrap();
        assert_eq!(specs[&FuelFamily::Diesel].primary, FuelType::SyntheticDiesel);
        assert_eq!(specs[&FuelFamily::Diesel].secondary, None);
        assert_eq!(
            specs[&FuelFamily::Hydrogen].secondary,
            Some(FuelType::Electrolysis)
        );
    }

    #[test]
    fn test_unknown_fuel_rejected() {
        let result = Config::parse(
            r#"
            [fuel_blend.diesel]
            primary = "kerosene"
            primary_share = [1.0]
            "#,
        );
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::UnknownFuel(_)))
        ));
    }

    #[test]
    fn test_invalid_functional_unit_rejected() {
        let result = Config::parse(r#"functional_unit = "pkm""#);
        assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
    }

    #[test]
    fn test_custom_mix_for_selected_consumers() {
        let mut shares = vec![0.0; ElectricityTechnology::COUNT];
        shares[ElectricityTechnology::Wind.position()] = 1.0;
        let config = Config {
            custom_electricity_mix: Some(CustomMixConfig {
                years: vec![2020],
                shares: vec![shares],
                consumers: vec![ElectricityConsumer::VehicleCharging],
            }),
            ..Config::default()
        };
        let mixes = config.custom_mixes().unwrap();
        assert_eq!(mixes.len(), 1);
        assert_eq!(
            mixes[&ElectricityConsumer::VehicleCharging].share(2020, ElectricityTechnology::Wind),
            1.0
        );
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            country: "DE".to_string(),
            static_mode: true,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.country, "DE");
        assert_eq!(loaded.year_mode(), YearMode::Static);
    }
}
