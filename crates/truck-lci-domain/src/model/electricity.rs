//! Electricity background: generation technologies, consumer markets and mixes

use std::collections::HashMap;
use std::fmt;

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;
use truck_lci_types::{Error, Result};

use super::interpolation::{bracket, Extrapolation};

/// Tolerance on the sum of a mix row
pub const MIX_TOLERANCE: f64 = 1e-6;

/// Generation technology, in mix-table column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElectricityTechnology {
    Hydro,
    Nuclear,
    Gas,
    Solar,
    Wind,
    Biomass,
    Coal,
    Oil,
    Geothermal,
    Waste,
    BiogasCcs,
    BiomassCcs,
    CoalCcs,
    GasCcs,
    WoodCcs,
}

impl ElectricityTechnology {
    pub const COUNT: usize = 15;

    pub const ALL: [ElectricityTechnology; 15] = [
        ElectricityTechnology::Hydro,
        ElectricityTechnology::Nuclear,
        ElectricityTechnology::Gas,
        ElectricityTechnology::Solar,
        ElectricityTechnology::Wind,
        ElectricityTechnology::Biomass,
        ElectricityTechnology::Coal,
        ElectricityTechnology::Oil,
        ElectricityTechnology::Geothermal,
        ElectricityTechnology::Waste,
        ElectricityTechnology::BiogasCcs,
        ElectricityTechnology::BiomassCcs,
        ElectricityTechnology::CoalCcs,
        ElectricityTechnology::GasCcs,
        ElectricityTechnology::WoodCcs,
    ];

    /// Column header in mix tables
    pub fn label(&self) -> &'static str {
        match self {
            ElectricityTechnology::Hydro => "Hydro",
            ElectricityTechnology::Nuclear => "Nuclear",
            ElectricityTechnology::Gas => "Gas",
            ElectricityTechnology::Solar => "Solar",
            ElectricityTechnology::Wind => "Wind",
            ElectricityTechnology::Biomass => "Biomass",
            ElectricityTechnology::Coal => "Coal",
            ElectricityTechnology::Oil => "Oil",
            ElectricityTechnology::Geothermal => "Geothermal",
            ElectricityTechnology::Waste => "Waste",
            ElectricityTechnology::BiogasCcs => "Biogas CCS",
            ElectricityTechnology::BiomassCcs => "Biomass CCS",
            ElectricityTechnology::CoalCcs => "Coal CCS",
            ElectricityTechnology::GasCcs => "Gas CCS",
            ElectricityTechnology::WoodCcs => "Wood CCS",
        }
    }

    /// Name of the reference generation dataset
    pub fn dataset_name(&self) -> &'static str {
        match self {
            ElectricityTechnology::Hydro => "electricity production, hydro, run-of-river",
            ElectricityTechnology::Nuclear => {
                "electricity production, nuclear, pressure water reactor"
            }
            ElectricityTechnology::Gas => {
                "electricity production, natural gas, combined cycle power plant"
            }
            ElectricityTechnology::Solar => {
                "electricity production, photovoltaic, 3kWp slanted-roof installation"
            }
            ElectricityTechnology::Wind => "electricity production, wind, 1-3MW turbine, onshore",
            ElectricityTechnology::Biomass => "heat and power co-generation, wood chips",
            ElectricityTechnology::Coal => "electricity production, hard coal",
            ElectricityTechnology::Oil => "electricity production, oil",
            ElectricityTechnology::Geothermal => "electricity production, deep geothermal",
            ElectricityTechnology::Waste => "treatment of municipal solid waste, incineration",
            ElectricityTechnology::BiogasCcs => {
                "electricity production, at biogas power plant, with CCS"
            }
            ElectricityTechnology::BiomassCcs => {
                "electricity production, at biomass power plant, with CCS"
            }
            ElectricityTechnology::CoalCcs => {
                "electricity production, at hard coal power plant, with CCS"
            }
            ElectricityTechnology::GasCcs => {
                "electricity production, at natural gas power plant, with CCS"
            }
            ElectricityTechnology::WoodCcs => {
                "electricity production, at wood burning power plant, with CCS"
            }
        }
    }

    pub fn position(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ElectricityTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Purpose a grid electricity market supplies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectricityConsumer {
    VehicleCharging,
    FuelPreparation,
    BatteryProduction,
}

impl ElectricityConsumer {
    pub const ALL: [ElectricityConsumer; 3] = [
        ElectricityConsumer::VehicleCharging,
        ElectricityConsumer::FuelPreparation,
        ElectricityConsumer::BatteryProduction,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ElectricityConsumer::VehicleCharging => "vehicle charging",
            ElectricityConsumer::FuelPreparation => "fuel preparation",
            ElectricityConsumer::BatteryProduction => "battery cell production",
        }
    }
}

impl fmt::Display for ElectricityConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Technology shares per calculation year, shaped (years, technologies)
#[derive(Debug, Clone, PartialEq)]
pub struct ElectricityMix {
    years: Vec<u16>,
    shares: Array2<f64>,
}

impl ElectricityMix {
    /// Build a mix from caller-supplied rows, one row per year.
    ///
    /// Fails with `InvalidMix` when the shape is not (years × 15) or a row
    /// does not sum to 1.
    pub fn custom(years: &[u16], rows: &[Vec<f64>]) -> Result<Self> {
        if rows.len() != years.len() {
            return Err(Error::InvalidMix(format!(
                "{} rows for {} years",
                rows.len(),
                years.len()
            )));
        }
        let mut shares = Array2::zeros((years.len(), ElectricityTechnology::COUNT));
        for (y, row) in rows.iter().enumerate() {
            if row.len() != ElectricityTechnology::COUNT {
                return Err(Error::InvalidMix(format!(
                    "row for {} has {} technologies, expected {}",
                    years[y],
                    row.len(),
                    ElectricityTechnology::COUNT
                )));
            }
            for (t, &share) in row.iter().enumerate() {
                shares[[y, t]] = share;
            }
        }
        let mix = Self {
            years: years.to_vec(),
            shares,
        };
        mix.validate()?;
        Ok(mix)
    }

    /// Every row non-negative and summing to 1
    pub fn validate(&self) -> Result<()> {
        if self.shares.dim() != (self.years.len(), ElectricityTechnology::COUNT) {
            return Err(Error::InvalidMix(format!(
                "shape {:?}, expected ({}, {})",
                self.shares.dim(),
                self.years.len(),
                ElectricityTechnology::COUNT
            )));
        }
        for (row, &year) in self.shares.axis_iter(Axis(0)).zip(&self.years) {
            if row.iter().any(|s| !s.is_finite() || *s < 0.0) {
                return Err(Error::InvalidMix(format!(
                    "negative or non-finite share in {}",
                    year
                )));
            }
            let sum = row.sum();
            if (sum - 1.0).abs() > MIX_TOLERANCE {
                return Err(Error::InvalidMix(format!(
                    "shares for {} sum to {}",
                    year, sum
                )));
            }
        }
        Ok(())
    }

    pub fn years(&self) -> &[u16] {
        &self.years
    }

    /// Shares for one year, in [`ElectricityTechnology::ALL`] order
    pub fn row(&self, year: u16) -> Option<ArrayView1<'_, f64>> {
        let y = self.years.iter().position(|&x| x == year)?;
        Some(self.shares.row(y))
    }

    pub fn share(&self, year: u16, technology: ElectricityTechnology) -> f64 {
        self.row(year)
            .map(|r| r[technology.position()])
            .unwrap_or(0.0)
    }

    /// Combined share of renewable technologies in one year
    pub fn renewable_share(&self, year: u16) -> f64 {
        use ElectricityTechnology::*;
        [Hydro, Solar, Wind, Biomass, Geothermal, BiogasCcs, BiomassCcs, WoodCcs]
            .iter()
            .map(|t| self.share(year, *t))
            .sum()
    }
}

/// Shares at reference years for one country, shaped (reference years, technologies)
#[derive(Debug, Clone)]
pub struct MixTable {
    reference_years: Vec<u16>,
    shares: Array2<f64>,
}

impl MixTable {
    pub fn new(reference_years: Vec<u16>, shares: Array2<f64>) -> Result<Self> {
        if reference_years.is_empty() {
            return Err(Error::ReferenceData("mix table without years".to_string()));
        }
        if shares.dim() != (reference_years.len(), ElectricityTechnology::COUNT) {
            return Err(Error::DimensionMismatch(format!(
                "mix table shape {:?} for {} reference years",
                shares.dim(),
                reference_years.len()
            )));
        }
        if reference_years.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::ReferenceData(
                "mix table years must be strictly ascending".to_string(),
            ));
        }
        Ok(Self {
            reference_years,
            shares,
        })
    }

    pub fn reference_years(&self) -> &[u16] {
        &self.reference_years
    }

    /// Mix at `years`, interpolated between reference years and held
    /// constant outside them. Rows are renormalized to sum to 1.
    pub fn at(&self, years: &[u16]) -> Result<ElectricityMix> {
        let mut shares = Array2::zeros((years.len(), ElectricityTechnology::COUNT));
        for (y, &year) in years.iter().enumerate() {
            let (lo, hi, w) = bracket(&self.reference_years, year, Extrapolation::Clamp);
            let mut row = shares.row_mut(y);
            row.assign(&(&self.shares.row(lo) * (1.0 - w) + &self.shares.row(hi) * w));
            let sum = row.sum();
            if sum > 0.0 {
                row /= sum;
            }
        }
        let mix = ElectricityMix {
            years: years.to_vec(),
            shares,
        };
        mix.validate()?;
        Ok(mix)
    }
}

/// Where a consumer market takes its mix from
#[derive(Debug, Clone)]
pub enum ElectricitySource {
    /// National mix, falling back to the country's region
    Country(String),
    /// Caller-supplied mix
    Custom(ElectricityMix),
}

/// Country mixes, grid losses and country-to-region mapping
#[derive(Debug, Clone, Default)]
pub struct ElectricityBackground {
    mixes: HashMap<String, MixTable>,
    losses: HashMap<String, f64>,
    regions: HashMap<String, String>,
}

impl ElectricityBackground {
    pub fn new(
        mixes: HashMap<String, MixTable>,
        losses: HashMap<String, f64>,
        regions: HashMap<String, String>,
    ) -> Self {
        Self {
            mixes,
            losses,
            regions,
        }
    }

    pub fn region_of(&self, country: &str) -> Option<&str> {
        self.regions.get(country).map(String::as_str)
    }

    /// Interpolated mix for `country`, or for its region when the country
    /// itself has no table
    pub fn mix_for(&self, country: &str, years: &[u16]) -> Result<ElectricityMix> {
        if let Some(table) = self.mixes.get(country) {
            return table.at(years);
        }
        match self.region_of(country).and_then(|r| self.mixes.get(r).map(|t| (r, t))) {
            Some((region, table)) => {
                warn!(country, region, "no electricity mix for country, using regional mix");
                table.at(years)
            }
            None => Err(Error::UnknownCountry {
                country: country.to_string(),
            }),
        }
    }

    /// Cumulative low-voltage loss multiplier (≥ 1) for `country`
    pub fn loss_factor(&self, country: &str) -> f64 {
        if let Some(&loss) = self.losses.get(country) {
            return loss;
        }
        if let Some(&loss) = self.region_of(country).and_then(|r| self.losses.get(r)) {
            return loss;
        }
        warn!(country, "no grid loss factor for country, assuming lossless supply");
        1.0
    }

    pub fn resolve(&self, source: &ElectricitySource, years: &[u16]) -> Result<ElectricityMix> {
        match source {
            ElectricitySource::Country(country) => self.mix_for(country, years),
            ElectricitySource::Custom(mix) => {
                mix.validate()?;
                if years.iter().any(|y| !mix.years.contains(y)) {
                    return Err(Error::InvalidMix(format!(
                        "custom mix covers {:?}, calculation needs {:?}",
                        mix.years, years
                    )));
                }
                Ok(mix.clone())
            }
        }
    }
}
