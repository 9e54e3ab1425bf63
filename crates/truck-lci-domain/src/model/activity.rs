//! Activity identity and lookup predicates

use std::fmt;

use serde::{Deserialize, Serialize};
use truck_lci_types::{EuroClass, FuelFamily, Powertrain, Size};

use super::electricity::ElectricityConsumer;

/// Identity of an economic activity or elementary flow.
///
/// Elementary flows carry no reference product; their `location` holds the
/// compartment path instead (e.g. `air::urban air close to ground`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityKey {
    pub name: String,
    pub location: String,
    pub unit: String,
    pub reference_product: Option<String>,
}

impl ActivityKey {
    pub fn new(name: &str, location: &str, unit: &str, reference_product: &str) -> Self {
        Self {
            name: name.to_string(),
            location: location.to_string(),
            unit: unit.to_string(),
            reference_product: Some(reference_product.to_string()),
        }
    }

    /// Elementary flow emitted to (or taken from) a compartment
    pub fn flow(name: &str, compartment: &str, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            location: compartment.to_string(),
            unit: unit.to_string(),
            reference_product: None,
        }
    }

    pub fn is_elementary(&self) -> bool {
        self.reference_product.is_none()
    }
}

impl fmt::Display for ActivityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference_product {
            Some(product) => write!(
                f,
                "({}, {}, {}, {})",
                self.name, self.location, self.unit, product
            ),
            None => write!(f, "({}, {}, {})", self.name, self.location, self.unit),
        }
    }
}

/// Activities generated for the calculation scope rather than read from
/// reference data. Addressed by value, never by substring search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProceduralActivity {
    /// Manufacture of one vehicle
    Truck {
        size: Size,
        powertrain: Powertrain,
        year: u16,
    },
    /// One unit of freight transport delivered by that vehicle
    Transport {
        size: Size,
        powertrain: Powertrain,
        year: u16,
    },
    /// Blended fuel supply for a fuel family
    FuelMarket { family: FuelFamily, year: u16 },
    /// Grid electricity supplied to one consumer
    ElectricityMarket {
        consumer: ElectricityConsumer,
        year: u16,
    },
}

impl ProceduralActivity {
    /// Build the activity key, using `location` as the geography
    pub fn key(&self, location: &str) -> ActivityKey {
        match *self {
            ProceduralActivity::Truck {
                size,
                powertrain,
                year,
            } => ActivityKey::new(
                &format!(
                    "Truck, {}, {} gross weight, {}{}",
                    powertrain,
                    size,
                    year,
                    euro_suffix(powertrain, year)
                ),
                location,
                "unit",
                &format!("Truck, {}, {} gross weight", powertrain, size),
            ),
            ProceduralActivity::Transport {
                size,
                powertrain,
                year,
            } => ActivityKey::new(
                &format!(
                    "transport, freight, lorry, {}, {} gross weight, {}{}",
                    powertrain,
                    size,
                    year,
                    euro_suffix(powertrain, year)
                ),
                location,
                "ton kilometer",
                "transport, freight, lorry",
            ),
            ProceduralActivity::FuelMarket { family, year } => ActivityKey::new(
                &format!("fuel supply for {} vehicles, {}", family, year),
                location,
                "kilogram",
                &format!("fuel, {}", family),
            ),
            ProceduralActivity::ElectricityMarket { consumer, year } => ActivityKey::new(
                &format!("electricity market for {}, {}", consumer.label(), year),
                location,
                "kilowatt hour",
                "electricity, low voltage",
            ),
        }
    }

    pub fn is_vehicle(&self) -> bool {
        matches!(
            self,
            ProceduralActivity::Truck { .. } | ProceduralActivity::Transport { .. }
        )
    }
}

fn euro_suffix(powertrain: Powertrain, year: u16) -> String {
    if powertrain.is_combustion() {
        format!(", {}", EuroClass::from_year(year).label())
    } else {
        String::new()
    }
}

/// How the substrings of a [`Selector`] are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Every substring must occur in the name
    #[default]
    All,
    /// At least one substring must occur in the name
    Any,
}

/// Substring predicate over activity names and locations.
///
/// Used for reference-data activities whose universe is only known once the
/// label dictionary has been loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    contains: Vec<String>,
    excludes: Vec<String>,
    location: Option<String>,
    mode: MatchMode,
}

impl Selector {
    pub fn all<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            contains: parts.into_iter().map(Into::into).collect(),
            mode: MatchMode::All,
            ..Default::default()
        }
    }

    pub fn any<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            contains: parts.into_iter().map(Into::into).collect(),
            mode: MatchMode::Any,
            ..Default::default()
        }
    }

    /// Reject names containing any of `parts`
    pub fn excluding<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(parts.into_iter().map(Into::into));
        self
    }

    /// Restrict to locations (or compartments) containing `location`
    pub fn in_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn matches(&self, key: &ActivityKey) -> bool {
        let name_ok = match self.mode {
            MatchMode::All => self.contains.iter().all(|s| key.name.contains(s.as_str())),
            MatchMode::Any => self.contains.iter().any(|s| key.name.contains(s.as_str())),
        };
        if !name_ok {
            return false;
        }
        if self.excludes.iter().any(|s| key.name.contains(s.as_str())) {
            return false;
        }
        match &self.location {
            Some(loc) => key.location.contains(loc.as_str()),
            None => true,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joiner = match self.mode {
            MatchMode::All => " & ",
            MatchMode::Any => " | ",
        };
        write!(f, "[{}]", self.contains.join(joiner))?;
        if !self.excludes.is_empty() {
            write!(f, " without [{}]", self.excludes.join(", "))?;
        }
        if let Some(loc) = &self.location {
            write!(f, " in '{}'", loc)?;
        }
        Ok(())
    }
}
