//! Vehicle Parameter Array: design quantities per vehicle cell and sample

use std::collections::HashMap;

use ndarray::{Array3, Array5, ArrayView4, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;
use truck_lci_types::{Error, Powertrain, Result, Size};

/// Parameter names read by the inventory. Masses in kg, energy per km.
pub mod names {
    pub const GLIDER_BASE_MASS: &str = "glider base mass";
    pub const LIGHTWEIGHTING: &str = "lightweighting";
    pub const SUSPENSION_MASS: &str = "suspension mass";
    pub const BRAKING_SYSTEM_MASS: &str = "braking system mass";
    pub const WHEELS_AND_TIRES_MASS: &str = "wheels and tires mass";
    pub const EXHAUST_SYSTEM_MASS: &str = "exhaust system mass";
    pub const ELECTRICAL_SYSTEM_MASS: &str = "electrical system mass";
    pub const TRANSMISSION_MASS: &str = "transmission mass";
    pub const OTHER_COMPONENTS_MASS: &str = "other components mass";
    pub const GROSS_MASS: &str = "gross mass";
    pub const DRIVING_MASS: &str = "driving mass";
    pub const CONVERTER_MASS: &str = "converter mass";
    pub const ELECTRIC_ENGINE_MASS: &str = "electric engine mass";
    pub const INVERTER_MASS: &str = "inverter mass";
    pub const POWER_DISTRIBUTION_UNIT_MASS: &str = "power distribution unit mass";
    pub const COMBUSTION_ENGINE_MASS: &str = "combustion engine mass";
    pub const BATTERY_BOP_MASS: &str = "battery BoP mass";
    pub const BATTERY_CELL_MASS: &str = "battery cell mass";
    pub const BATTERY_REPLACEMENTS: &str = "battery lifetime replacements";
    pub const BATTERY_CELL_PRODUCTION_ELECTRICITY: &str = "battery cell production electricity";
    pub const FUEL_CELL_STACK_MASS: &str = "fuel cell stack mass";
    pub const FUEL_CELL_REPLACEMENTS: &str = "fuel cell lifetime replacements";
    pub const FUEL_TANK_MASS: &str = "fuel tank mass";
    pub const ELECTRIC_ENERGY_STORED: &str = "electric energy stored";
    pub const LIFETIME_KILOMETERS: &str = "lifetime kilometers";
    pub const KILOMETERS_PER_YEAR: &str = "kilometers per year";
    pub const TOTAL_CARGO_MASS: &str = "total cargo mass";
    pub const TTW_ENERGY: &str = "TtW energy";
    pub const ELECTRICITY_CONSUMPTION: &str = "electricity consumption";
    pub const CNG_LEAKAGE: &str = "CNG pump-to-tank leakage";
    pub const TIRE_WEAR: &str = "tire wear emissions";
    pub const BRAKE_WEAR: &str = "brake wear emissions";
    pub const ROAD_WEAR: &str = "road wear emissions";
    /// Initial A/C refrigerant charge, kg
    pub const REFRIGERANT_CHARGE: &str = "refrigerant charge";
    /// Share of the A/C charge lost per year of use
    pub const REFRIGERANT_LEAKAGE: &str = "refrigerant annual leakage";

    /// Exhaust pollutants reported per driving segment as
    /// `"<pollutant> direct emissions, <segment>"`, kg/km.
    pub const EXHAUST_POLLUTANTS: [&str; 11] = [
        "Hydrocarbons",
        "Carbon monoxide",
        "Nitrogen oxides",
        "Particulate matters",
        "Nitrogen dioxide",
        "Methane",
        "NMVOC",
        "Sulfur dioxide",
        "Dinitrogen oxide",
        "Ammonia",
        "Benzene",
    ];

    pub const DRIVING_SEGMENTS: [&str; 3] = ["urban", "suburban", "rural"];

    pub fn exhaust_parameter(pollutant: &str, segment: &str) -> String {
        format!("{} direct emissions, {}", pollutant, segment)
    }

    /// Octave bands of the sound power emitted per km
    pub const NOISE_OCTAVES: usize = 8;

    /// Sound power of one octave band in one driving segment, joule/km.
    /// Also the name of the elementary flow it is reported as.
    pub fn noise_parameter(octave: usize, segment: &str) -> String {
        format!("noise, octave {}, day time, {}", octave, segment)
    }

    /// Every parameter the inventory reads
    pub fn required() -> Vec<String> {
        let mut all: Vec<String> = [
            GLIDER_BASE_MASS,
            LIGHTWEIGHTING,
            SUSPENSION_MASS,
            BRAKING_SYSTEM_MASS,
            WHEELS_AND_TIRES_MASS,
            EXHAUST_SYSTEM_MASS,
            ELECTRICAL_SYSTEM_MASS,
            TRANSMISSION_MASS,
            OTHER_COMPONENTS_MASS,
            GROSS_MASS,
            DRIVING_MASS,
            CONVERTER_MASS,
            ELECTRIC_ENGINE_MASS,
            INVERTER_MASS,
            POWER_DISTRIBUTION_UNIT_MASS,
            COMBUSTION_ENGINE_MASS,
            BATTERY_BOP_MASS,
            BATTERY_CELL_MASS,
            BATTERY_REPLACEMENTS,
            BATTERY_CELL_PRODUCTION_ELECTRICITY,
            FUEL_CELL_STACK_MASS,
            FUEL_CELL_REPLACEMENTS,
            FUEL_TANK_MASS,
            ELECTRIC_ENERGY_STORED,
            LIFETIME_KILOMETERS,
            KILOMETERS_PER_YEAR,
            TOTAL_CARGO_MASS,
            TTW_ENERGY,
            ELECTRICITY_CONSUMPTION,
            CNG_LEAKAGE,
            TIRE_WEAR,
            BRAKE_WEAR,
            ROAD_WEAR,
            REFRIGERANT_CHARGE,
            REFRIGERANT_LEAKAGE,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        for pollutant in EXHAUST_POLLUTANTS {
            for segment in DRIVING_SEGMENTS {
                all.push(exhaust_parameter(pollutant, segment));
            }
        }
        for segment in DRIVING_SEGMENTS {
            for octave in 1..=NOISE_OCTAVES {
                all.push(noise_parameter(octave, segment));
            }
        }
        all
    }
}

/// Resolved parameter position, obtained from [`VehicleParameters::id`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamId(usize);

/// Position of a vehicle along the size, powertrain and year axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VehicleCell {
    pub size: usize,
    pub powertrain: usize,
    pub year: usize,
}

/// Caller-supplied change to the parameter array. `None` coordinates apply
/// to every entry along that axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterOverride {
    pub parameter: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub powertrain: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
    pub value: f64,
}

/// Dense array indexed by (parameter, size, powertrain, year, sample)
#[derive(Debug, Clone)]
pub struct VehicleParameters {
    names: Vec<String>,
    lookup: HashMap<String, usize>,
    sizes: Vec<Size>,
    powertrains: Vec<Powertrain>,
    years: Vec<u16>,
    values: Array5<f64>,
}

impl VehicleParameters {
    /// Zero-filled array over the given axes
    pub fn new(
        names: Vec<String>,
        sizes: Vec<Size>,
        powertrains: Vec<Powertrain>,
        years: Vec<u16>,
        samples: usize,
    ) -> Self {
        let lookup = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        let values = Array5::zeros((
            names.len(),
            sizes.len(),
            powertrains.len(),
            years.len(),
            samples.max(1),
        ));
        Self {
            names,
            lookup,
            sizes,
            powertrains,
            years,
            values,
        }
    }

    pub fn sizes(&self) -> &[Size] {
        &self.sizes
    }

    pub fn powertrains(&self) -> &[Powertrain] {
        &self.powertrains
    }

    pub fn years(&self) -> &[u16] {
        &self.years
    }

    pub fn samples(&self) -> usize {
        self.values.len_of(Axis(4))
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.names
    }

    pub fn id(&self, name: &str) -> Result<ParamId> {
        self.lookup
            .get(name)
            .map(|&i| ParamId(i))
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))
    }

    /// Fail on the first parameter in `names` that is absent
    pub fn require_all(&self, names: &[String]) -> Result<()> {
        for name in names {
            self.id(name)?;
        }
        Ok(())
    }

    pub fn value(&self, param: ParamId, cell: VehicleCell, sample: usize) -> f64 {
        self.values[[param.0, cell.size, cell.powertrain, cell.year, sample]]
    }

    /// View over (size, powertrain, year, sample) for one parameter
    pub fn view(&self, param: ParamId) -> ArrayView4<'_, f64> {
        self.values.index_axis(Axis(0), param.0)
    }

    pub fn set(&mut self, param: ParamId, cell: VehicleCell, sample: usize, value: f64) {
        self.values[[param.0, cell.size, cell.powertrain, cell.year, sample]] = value;
    }

    /// Set a parameter to `value` everywhere
    pub fn fill(&mut self, name: &str, value: f64) -> Result<()> {
        let id = self.id(name)?;
        self.values.index_axis_mut(Axis(0), id.0).fill(value);
        Ok(())
    }

    /// Set a parameter for every sample of one cell
    pub fn fill_cell(&mut self, name: &str, cell: VehicleCell, value: f64) -> Result<()> {
        let id = self.id(name)?;
        for s in 0..self.samples() {
            self.set(id, cell, s, value);
        }
        Ok(())
    }

    pub fn cells(&self) -> impl Iterator<Item = VehicleCell> + '_ {
        (0..self.sizes.len()).flat_map(move |size| {
            (0..self.powertrains.len()).flat_map(move |powertrain| {
                (0..self.years.len()).map(move |year| VehicleCell {
                    size,
                    powertrain,
                    year,
                })
            })
        })
    }

    pub fn cell_of(&self, size: Size, powertrain: Powertrain, year: u16) -> Option<VehicleCell> {
        Some(VehicleCell {
            size: self.sizes.iter().position(|s| *s == size)?,
            powertrain: self.powertrains.iter().position(|p| *p == powertrain)?,
            year: self.years.iter().position(|y| *y == year)?,
        })
    }

    pub fn size_of(&self, cell: VehicleCell) -> Size {
        self.sizes[cell.size]
    }

    pub fn powertrain_of(&self, cell: VehicleCell) -> Powertrain {
        self.powertrains[cell.powertrain]
    }

    pub fn year_of(&self, cell: VehicleCell) -> u16 {
        self.years[cell.year]
    }

    /// Apply overrides across all samples.
    ///
    /// Unknown parameter, size or powertrain names are reported and skipped.
    /// Returns the number of overrides applied.
    pub fn apply_overrides(&mut self, overrides: &[ParameterOverride]) -> usize {
        let mut applied = 0;
        for o in overrides {
            let Ok(id) = self.id(&o.parameter) else {
                warn!(parameter = %o.parameter, "unknown parameter in override, skipped");
                continue;
            };
            let size = match &o.size {
                Some(label) => match label.parse::<Size>().ok().and_then(|s| {
                    self.sizes.iter().position(|x| *x == s)
                }) {
                    Some(i) => Some(i),
                    None => {
                        warn!(size = %label, parameter = %o.parameter, "size not in scope, override skipped");
                        continue;
                    }
                },
                None => None,
            };
            let powertrain = match &o.powertrain {
                Some(label) => match label.parse::<Powertrain>().ok().and_then(|p| {
                    self.powertrains.iter().position(|x| *x == p)
                }) {
                    Some(i) => Some(i),
                    None => {
                        warn!(powertrain = %label, parameter = %o.parameter, "powertrain not in scope, override skipped");
                        continue;
                    }
                },
                None => None,
            };
            let year = match o.year {
                Some(y) => match self.years.iter().position(|x| *x == y) {
                    Some(i) => Some(i),
                    None => {
                        warn!(year = y, parameter = %o.parameter, "year not in scope, override skipped");
                        continue;
                    }
                },
                None => None,
            };

            let cells: Vec<VehicleCell> = self
                .cells()
                .filter(|c| {
                    size.map_or(true, |s| c.size == s)
                        && powertrain.map_or(true, |p| c.powertrain == p)
                        && year.map_or(true, |y| c.year == y)
                })
                .collect();
            for cell in cells {
                for s in 0..self.samples() {
                    self.set(id, cell, s, o.value);
                }
            }
            applied += 1;
        }
        applied
    }

    /// Restrict the year axis to `years`, in the given order
    pub fn select_years(&self, years: &[u16]) -> Result<Self> {
        let indices = years
            .iter()
            .map(|y| {
                self.years.iter().position(|x| x == y).ok_or_else(|| {
                    Error::DimensionMismatch(format!(
                        "year {} not in parameter years {:?}",
                        y, self.years
                    ))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        Ok(Self {
            names: self.names.clone(),
            lookup: self.lookup.clone(),
            sizes: self.sizes.clone(),
            powertrains: self.powertrains.clone(),
            years: years.to_vec(),
            values: self.values.select(Axis(3), &indices),
        })
    }

    /// Mean over samples for one parameter, shaped (size, powertrain, year)
    pub fn sample_mean(&self, param: ParamId) -> Option<Array3<f64>> {
        self.view(param).mean_axis(Axis(3))
    }
}
