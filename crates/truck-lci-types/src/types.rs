//! Vehicle design-space coordinates shared by every layer

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Truck size class, named after the permissible gross weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Size {
    #[serde(rename = "3.5t")]
    T3_5,
    #[serde(rename = "7.5t")]
    T7_5,
    #[serde(rename = "18t")]
    T18,
    #[serde(rename = "26t")]
    T26,
    #[serde(rename = "32t")]
    T32,
    #[serde(rename = "40t")]
    T40,
    #[serde(rename = "60t")]
    T60,
}

impl Size {
    pub const ALL: [Size; 7] = [
        Size::T3_5,
        Size::T7_5,
        Size::T18,
        Size::T26,
        Size::T32,
        Size::T40,
        Size::T60,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Size::T3_5 => "3.5t",
            Size::T7_5 => "7.5t",
            Size::T18 => "18t",
            Size::T26 => "26t",
            Size::T32 => "32t",
            Size::T40 => "40t",
            Size::T60 => "60t",
        }
    }

    /// Nominal permissible gross weight in tonnes
    pub fn nominal_gross_mass_t(&self) -> f64 {
        match self {
            Size::T3_5 => 3.5,
            Size::T7_5 => 7.5,
            Size::T18 => 18.0,
            Size::T26 => 26.0,
            Size::T32 => 32.0,
            Size::T40 => 40.0,
            Size::T60 => 60.0,
        }
    }

    pub fn weight_tier(&self) -> WeightTier {
        WeightTier::from_gross_mass_t(self.nominal_gross_mass_t())
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Size {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Size::ALL
            .iter()
            .find(|size| size.label().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown size '{}'", s))
    }
}

/// Gross-mass bucket used to pick maintenance and end-of-life datasets.
///
/// The reference datasets exist for 16 t, 28 t and 40 t lorries; every size
/// is scaled against the dataset of its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightTier {
    /// Below 26 t
    Light,
    /// 26 t up to (excluding) 40 t
    Medium,
    /// 40 t and above
    Heavy,
}

impl WeightTier {
    pub fn from_gross_mass_t(mass_t: f64) -> Self {
        if mass_t < 26.0 {
            WeightTier::Light
        } else if mass_t < 40.0 {
            WeightTier::Medium
        } else {
            WeightTier::Heavy
        }
    }

    /// Gross mass of the reference lorry dataset, in tonnes
    pub fn reference_mass_t(&self) -> f64 {
        match self {
            WeightTier::Light => 16.0,
            WeightTier::Medium => 28.0,
            WeightTier::Heavy => 40.0,
        }
    }

    /// Label fragment used in reference dataset names ("lorry 16 metric ton")
    pub fn dataset_label(&self) -> &'static str {
        match self {
            WeightTier::Light => "16 metric ton",
            WeightTier::Medium => "28 metric ton",
            WeightTier::Heavy => "40 metric ton",
        }
    }
}

/// Powertrain type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Powertrain {
    #[serde(rename = "ICEV-d")]
    IcevD,
    #[serde(rename = "ICEV-g")]
    IcevG,
    #[serde(rename = "HEV-d")]
    HevD,
    #[serde(rename = "PHEV-d")]
    PhevD,
    #[serde(rename = "BEV")]
    Bev,
    #[serde(rename = "FCEV")]
    Fcev,
}

impl Powertrain {
    pub const ALL: [Powertrain; 6] = [
        Powertrain::IcevD,
        Powertrain::IcevG,
        Powertrain::HevD,
        Powertrain::PhevD,
        Powertrain::Bev,
        Powertrain::Fcev,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Powertrain::IcevD => "ICEV-d",
            Powertrain::IcevG => "ICEV-g",
            Powertrain::HevD => "HEV-d",
            Powertrain::PhevD => "PHEV-d",
            Powertrain::Bev => "BEV",
            Powertrain::Fcev => "FCEV",
        }
    }

    /// Fuel family burnt or converted on board, if any
    pub fn fuel_family(&self) -> Option<FuelFamily> {
        match self {
            Powertrain::IcevD | Powertrain::HevD | Powertrain::PhevD => Some(FuelFamily::Diesel),
            Powertrain::IcevG => Some(FuelFamily::Cng),
            Powertrain::Fcev => Some(FuelFamily::Hydrogen),
            Powertrain::Bev => None,
        }
    }

    /// Has an internal combustion engine
    pub fn is_combustion(&self) -> bool {
        matches!(
            self,
            Powertrain::IcevD | Powertrain::IcevG | Powertrain::HevD | Powertrain::PhevD
        )
    }

    /// Driven by electric motors only
    pub fn is_electric_drive(&self) -> bool {
        matches!(self, Powertrain::Bev | Powertrain::Fcev)
    }

    /// Charged from the grid
    pub fn is_plugin(&self) -> bool {
        matches!(self, Powertrain::Bev | Powertrain::PhevD)
    }

    /// Uses a lead-acid starter battery instead of a traction battery
    pub fn has_starter_battery_only(&self) -> bool {
        matches!(self, Powertrain::IcevD | Powertrain::IcevG)
    }
}

impl fmt::Display for Powertrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Powertrain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Powertrain::ALL
            .iter()
            .find(|pt| pt.label().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown powertrain '{}'", s))
    }
}

/// Emission-regulation tier of a combustion vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EuroClass {
    Euro3,
    Euro4,
    Euro5,
    Euro6,
}

impl EuroClass {
    /// Euro class applicable to vehicles of a given model year.
    /// Years before 2000 are treated as Euro 3.
    pub fn from_year(year: u16) -> Self {
        match year {
            0..=2004 => EuroClass::Euro3,
            2005..=2007 => EuroClass::Euro4,
            2008..=2011 => EuroClass::Euro5,
            _ => EuroClass::Euro6,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EuroClass::Euro3 => "EURO-III",
            EuroClass::Euro4 => "EURO-IV",
            EuroClass::Euro5 => "EURO-V",
            EuroClass::Euro6 => "EURO-VI",
        }
    }
}

/// Fuel family supplied through a fuel market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelFamily {
    Diesel,
    Cng,
    Hydrogen,
}

impl FuelFamily {
    pub const ALL: [FuelFamily; 3] = [FuelFamily::Diesel, FuelFamily::Cng, FuelFamily::Hydrogen];

    pub fn label(&self) -> &'static str {
        match self {
            FuelFamily::Diesel => "diesel",
            FuelFamily::Cng => "cng",
            FuelFamily::Hydrogen => "hydrogen",
        }
    }

    /// Default (primary, secondary) pair used when the family is not configured
    pub fn default_pair(&self) -> (FuelType, FuelType) {
        match self {
            FuelFamily::Diesel => (FuelType::Diesel, FuelType::BiodieselCookingOil),
            FuelFamily::Cng => (FuelType::Cng, FuelType::BiogasSewageSludge),
            FuelFamily::Hydrogen => (FuelType::Electrolysis, FuelType::SmrNaturalGas),
        }
    }

    /// Every fuel type of the family, default primary first
    pub fn members(&self) -> Vec<FuelType> {
        FuelType::ALL
            .iter()
            .filter(|fuel| fuel.family() == *self)
            .copied()
            .collect()
    }
}

impl fmt::Display for FuelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fuel production pathway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FuelType {
    Diesel,
    BiodieselCookingOil,
    BiodieselAlgae,
    SyntheticDiesel,
    Cng,
    BiogasSewageSludge,
    BiogasBiowaste,
    Syngas,
    Electrolysis,
    SmrNaturalGas,
    SmrNaturalGasCcs,
    SmrBiogas,
    SmrBiogasCcs,
    CoalGasification,
    WoodGasification,
    WoodGasificationCcs,
}

impl FuelType {
    pub const ALL: [FuelType; 16] = [
        FuelType::Diesel,
        FuelType::BiodieselCookingOil,
        FuelType::BiodieselAlgae,
        FuelType::SyntheticDiesel,
        FuelType::Cng,
        FuelType::BiogasSewageSludge,
        FuelType::BiogasBiowaste,
        FuelType::Syngas,
        FuelType::Electrolysis,
        FuelType::SmrNaturalGas,
        FuelType::SmrNaturalGasCcs,
        FuelType::SmrBiogas,
        FuelType::SmrBiogasCcs,
        FuelType::CoalGasification,
        FuelType::WoodGasification,
        FuelType::WoodGasificationCcs,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FuelType::Diesel => "diesel",
            FuelType::BiodieselCookingOil => "biodiesel - cooking oil",
            FuelType::BiodieselAlgae => "biodiesel - algae",
            FuelType::SyntheticDiesel => "synthetic diesel",
            FuelType::Cng => "cng",
            FuelType::BiogasSewageSludge => "biogas - sewage sludge",
            FuelType::BiogasBiowaste => "biogas - biowaste",
            FuelType::Syngas => "syngas",
            FuelType::Electrolysis => "electrolysis",
            FuelType::SmrNaturalGas => "smr - natural gas",
            FuelType::SmrNaturalGasCcs => "smr - natural gas with CCS",
            FuelType::SmrBiogas => "smr - biogas",
            FuelType::SmrBiogasCcs => "smr - biogas with CCS",
            FuelType::CoalGasification => "coal gasification",
            FuelType::WoodGasification => "wood gasification",
            FuelType::WoodGasificationCcs => "wood gasification with CCS",
        }
    }

    pub fn family(&self) -> FuelFamily {
        match self {
            FuelType::Diesel
            | FuelType::BiodieselCookingOil
            | FuelType::BiodieselAlgae
            | FuelType::SyntheticDiesel => FuelFamily::Diesel,
            FuelType::Cng
            | FuelType::BiogasSewageSludge
            | FuelType::BiogasBiowaste
            | FuelType::Syngas => FuelFamily::Cng,
            _ => FuelFamily::Hydrogen,
        }
    }

    /// Lower heating value, MJ/kg
    pub fn lhv_mj_per_kg(&self) -> f64 {
        match self {
            FuelType::Diesel => 42.8,
            FuelType::BiodieselCookingOil | FuelType::BiodieselAlgae => 31.7,
            FuelType::SyntheticDiesel => 43.3,
            FuelType::Cng
            | FuelType::BiogasSewageSludge
            | FuelType::BiogasBiowaste
            | FuelType::Syngas => 55.5,
            _ => 120.0,
        }
    }

    /// Tailpipe CO2 per kg of fuel burnt
    pub fn co2_kg_per_kg(&self) -> f64 {
        match self {
            FuelType::Diesel => 3.14,
            FuelType::BiodieselCookingOil | FuelType::BiodieselAlgae => 2.85,
            FuelType::SyntheticDiesel => 3.16,
            FuelType::Cng
            | FuelType::BiogasSewageSludge
            | FuelType::BiogasBiowaste
            | FuelType::Syngas => 2.65,
            _ => 0.0,
        }
    }

    /// Whether tailpipe CO2 counts as fossil
    pub fn is_fossil(&self) -> bool {
        matches!(self, FuelType::Diesel | FuelType::Cng)
    }

    /// Grid electricity drawn from the fuel-preparation market, kWh per kg of fuel
    pub fn electricity_kwh_per_kg(&self) -> f64 {
        match self {
            FuelType::Electrolysis => 58.0,
            _ => 0.0,
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FuelType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FuelType::ALL
            .iter()
            .find(|fuel| fuel.label().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| ConfigError::UnknownFuel(s.to_string()))
    }
}

/// Basis of comparison for results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionalUnit {
    /// One tonne of cargo moved over one kilometer
    #[default]
    Tkm,
    /// One vehicle moved over one kilometer
    Vkm,
}

impl FromStr for FunctionalUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tkm" | "ton-km" | "ton kilometer" => Ok(FunctionalUnit::Tkm),
            "vkm" | "vehicle-km" | "vehicle kilometer" => Ok(FunctionalUnit::Vkm),
            _ => Err(ConfigError::InvalidFunctionalUnit(s.to_string())),
        }
    }
}

impl fmt::Display for FunctionalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionalUnit::Tkm => write!(f, "tkm"),
            FunctionalUnit::Vkm => write!(f, "vkm"),
        }
    }
}

/// Fixed taxonomy results are bucketed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultCategory {
    DirectExhaust,
    DirectNonExhaust,
    EnergyChain,
    Maintenance,
    Glider,
    Powertrain,
    EnergyStorage,
    Road,
    EndOfLife,
}

impl ResultCategory {
    pub const ALL: [ResultCategory; 9] = [
        ResultCategory::DirectExhaust,
        ResultCategory::DirectNonExhaust,
        ResultCategory::EnergyChain,
        ResultCategory::Maintenance,
        ResultCategory::Glider,
        ResultCategory::Powertrain,
        ResultCategory::EnergyStorage,
        ResultCategory::Road,
        ResultCategory::EndOfLife,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResultCategory::DirectExhaust => "direct - exhaust",
            ResultCategory::DirectNonExhaust => "direct - non-exhaust",
            ResultCategory::EnergyChain => "energy chain",
            ResultCategory::Maintenance => "maintenance",
            ResultCategory::Glider => "glider",
            ResultCategory::Powertrain => "powertrain",
            ResultCategory::EnergyStorage => "energy storage",
            ResultCategory::Road => "road",
            ResultCategory::EndOfLife => "EoL",
        }
    }

    /// Position along the result-category axis of a result array
    pub fn position(&self) -> usize {
        ResultCategory::ALL
            .iter()
            .position(|c| c == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for ResultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResultCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ResultCategory::ALL
            .iter()
            .find(|c| c.label().eq_ignore_ascii_case(needle))
            .copied()
            .ok_or_else(|| format!("unknown result category '{}'", s))
    }
}
