//! Electricity and fuel market activities built from technology shares

use tracing::{debug, warn};
use truck_lci_types::{FuelFamily, FuelType, Powertrain, Result, ResultCategory};

use crate::model::{
    ActivityRegistry, ElectricityBackground, ElectricityConsumer, ElectricitySource,
    ElectricityTechnology, FuelBlend, ProceduralActivity, Selector,
};
use crate::service::matrix_builder::{InjectMode, TechnologyMatrixBuilder};

/// Grid infrastructure and SF6 leakage per kWh delivered at low voltage
const GRID_ADD_ONS: [(&str, Option<&str>, f64); 4] = [
    ("transmission network construction, electricity, high voltage", None, 6.58e-9),
    ("distribution network construction, electricity, medium voltage", None, 1.86e-8),
    ("distribution network construction, electricity, low voltage", None, 8.74e-8),
    ("Sulfur hexafluoride", Some("air"), 2.84e-8),
];

/// Name of the reference dataset producing one kg of a fuel
pub fn fuel_dataset(fuel: FuelType) -> &'static str {
    match fuel {
        FuelType::Diesel => "market for diesel, low-sulfur",
        FuelType::BiodieselCookingOil => "biodiesel production, from used cooking oil",
        FuelType::BiodieselAlgae => "biodiesel production, from algae",
        FuelType::SyntheticDiesel => "diesel production, synthetic, Fischer Tropsch process",
        FuelType::Cng => "market for natural gas, high pressure",
        FuelType::BiogasSewageSludge => "biogas upgrading, sewage sludge",
        FuelType::BiogasBiowaste => "biogas upgrading, biowaste",
        FuelType::Syngas => "methane production, from electrochemical methanation",
        FuelType::Electrolysis => "hydrogen production, electrolysis, excluding electricity",
        FuelType::SmrNaturalGas => "hydrogen production, steam methane reforming, from natural gas",
        FuelType::SmrNaturalGasCcs => {
            "hydrogen production, steam methane reforming, from natural gas, with CCS"
        }
        FuelType::SmrBiogas => "hydrogen production, steam methane reforming, from biomethane",
        FuelType::SmrBiogasCcs => {
            "hydrogen production, steam methane reforming, from biomethane, with CCS"
        }
        FuelType::CoalGasification => "hydrogen production, coal gasification",
        FuelType::WoodGasification => "hydrogen production, gasification of woody biomass",
        FuelType::WoodGasificationCcs => {
            "hydrogen production, gasification of woody biomass, with CCS"
        }
    }
}

/// Exact-name selector that does not also match the CCS variant of a dataset
fn dataset_selector(name: &str) -> Selector {
    if name.contains("CCS") {
        Selector::all([name])
    } else {
        Selector::all([name]).excluding(["CCS"])
    }
}

/// Register one fuel market per fuel family in scope and one electricity
/// market per consumer, for every calculation year
pub fn register_markets(
    registry: &mut ActivityRegistry,
    powertrains: &[Powertrain],
    years: &[u16],
    location: &str,
) {
    for &year in years {
        for family in FuelFamily::ALL {
            if powertrains.iter().any(|p| p.fuel_family() == Some(family)) {
                registry.register_procedural(ProceduralActivity::FuelMarket { family, year }, location);
            }
        }
        for consumer in ElectricityConsumer::ALL {
            registry.register_procedural(
                ProceduralActivity::ElectricityMarket { consumer, year },
                location,
            );
        }
    }
}

/// Fills market columns and records which reference activities they draw on
pub struct MarketMixer<'a> {
    registry: &'a ActivityRegistry,
    background: &'a ElectricityBackground,
    country: String,
    assignments: Vec<(usize, ResultCategory)>,
}

impl<'a> MarketMixer<'a> {
    pub fn new(
        registry: &'a ActivityRegistry,
        background: &'a ElectricityBackground,
        country: &str,
    ) -> Self {
        Self {
            registry,
            background,
            country: country.to_string(),
            assignments: Vec::new(),
        }
    }

    /// Energy-chain assignments of every reference activity the markets used
    pub fn into_assignments(self) -> Vec<(usize, ResultCategory)> {
        self.assignments
    }

    fn reference(&mut self, selector: &Selector) -> Option<usize> {
        match self.registry.resolve_first(selector) {
            Some(idx) => {
                self.assignments.push((idx, ResultCategory::EnergyChain));
                Some(idx)
            }
            None => {
                warn!(%selector, "market input not found, skipped");
                None
            }
        }
    }

    /// Fill the consumer's market for every year: each technology supplies
    /// `share × loss factor` kWh per kWh, plus grid add-ons.
    ///
    /// Markets that were never registered are skipped.
    pub fn mix_electricity(
        &mut self,
        builder: &mut TechnologyMatrixBuilder,
        consumer: ElectricityConsumer,
        source: &ElectricitySource,
        years: &[u16],
    ) -> Result<()> {
        let mix = self.background.resolve(source, years)?;
        let loss = self.background.loss_factor(&self.country);

        let technologies: Vec<(ElectricityTechnology, Option<usize>)> = ElectricityTechnology::ALL
            .iter()
            .map(|t| (*t, self.registry.resolve_first(&dataset_selector(t.dataset_name()))))
            .collect();
        let add_ons: Vec<(usize, f64)> = GRID_ADD_ONS
            .iter()
            .filter_map(|(name, compartment, amount)| {
                let selector = match compartment {
                    Some(c) => Selector::all([*name]).in_location(c),
                    None => Selector::all([*name]),
                };
                self.reference(&selector).map(|idx| (idx, *amount))
            })
            .collect();

        for &year in years {
            let Some(market) = self
                .registry
                .procedural(&ProceduralActivity::ElectricityMarket { consumer, year })
            else {
                continue;
            };
            for &(technology, product) in &technologies {
                let share = mix.share(year, technology);
                if share == 0.0 {
                    continue;
                }
                match product {
                    Some(idx) => {
                        self.assignments.push((idx, ResultCategory::EnergyChain));
                        builder.set_all_samples(idx, market, InjectMode::Set, -share * loss);
                    }
                    None => warn!(
                        technology = %technology,
                        year,
                        share,
                        "no dataset for generation technology, share dropped"
                    ),
                }
            }
            for &(idx, amount) in &add_ons {
                builder.set_all_samples(idx, market, InjectMode::Set, -amount);
            }
            debug!(consumer = %consumer, year, renewable = mix.renewable_share(year), "electricity market mixed");
        }
        Ok(())
    }

    /// Fill a family's fuel market: one kg of blend draws `share` kg of each
    /// component, plus the electricity its production consumes.
    pub fn mix_fuel(&mut self, builder: &mut TechnologyMatrixBuilder, blend: &FuelBlend) -> Result<()> {
        let family = blend.family();
        for (yi, &year) in blend.years().iter().enumerate() {
            let Some(market) = self
                .registry
                .procedural(&ProceduralActivity::FuelMarket { family, year })
            else {
                continue;
            };
            let mut electricity = 0.0;
            for (fuel, share) in blend.components(yi) {
                if share == 0.0 {
                    continue;
                }
                electricity += share * fuel.electricity_kwh_per_kg();
                if let Some(idx) = self.reference(&dataset_selector(fuel_dataset(fuel))) {
                    builder.set_all_samples(idx, market, InjectMode::Set, -share);
                }
            }
            if electricity > 0.0 {
                let grid = self.registry.require_procedural(&ProceduralActivity::ElectricityMarket {
                    consumer: ElectricityConsumer::FuelPreparation,
                    year,
                })?;
                self.assignments.push((grid, ResultCategory::EnergyChain));
                builder.set_all_samples(grid, market, InjectMode::Set, -electricity);
            }
            debug!(family = %family, year, primary = %blend.primary(), "fuel market mixed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::model::{ActivityKey, BaseMatrix, ElectricityMix, FuelBlendSpec};

    fn registry() -> ActivityRegistry {
        let mut reg = ActivityRegistry::new();
        for t in ElectricityTechnology::ALL {
            reg.register(ActivityKey::new(t.dataset_name(), "CH", "kilowatt hour", "electricity"));
        }
        for (name, compartment, _) in GRID_ADD_ONS {
            match compartment {
                Some(c) => reg.register(ActivityKey::flow(name, c, "kilogram")),
                None => reg.register(ActivityKey::new(name, "CH", "kilometer", name)),
            };
        }
        for fuel in FuelFamily::Hydrogen.members() {
            reg.register(ActivityKey::new(fuel_dataset(fuel), "RER", "kilogram", "hydrogen"));
        }
        reg
    }

    fn single(tech: ElectricityTechnology) -> Vec<f64> {
        let mut row = vec![0.0; ElectricityTechnology::COUNT];
        row[tech.position()] = 1.0;
        row
    }

    fn background() -> ElectricityBackground {
        let mut losses = HashMap::new();
        losses.insert("CH".to_string(), 1.05);
        ElectricityBackground::new(HashMap::new(), losses, HashMap::new())
    }

    #[test]
    fn test_single_technology_mix_feeds_only_that_technology() {
        let mut reg = registry();
        register_markets(&mut reg, &[Powertrain::Bev], &[2020], "CH");
        let bg = background();
        let mut builder = TechnologyMatrixBuilder::from_base(&BaseMatrix::new(0), reg.len(), 1).unwrap();
        let mix = ElectricityMix::custom(&[2020], &[single(ElectricityTechnology::Wind)]).unwrap();

        let mut mixer = MarketMixer::new(&reg, &bg, "CH");
        mixer
            .mix_electricity(
                &mut builder,
                ElectricityConsumer::VehicleCharging,
                &ElectricitySource::Custom(mix),
                &[2020],
            )
            .unwrap();

        let market = reg
            .procedural(&ProceduralActivity::ElectricityMarket {
                consumer: ElectricityConsumer::VehicleCharging,
                year: 2020,
            })
            .unwrap();
        for t in ElectricityTechnology::ALL {
            let expected = if t == ElectricityTechnology::Wind { -1.05 } else { 0.0 };
            assert!((builder.get(0, t.position(), market) - expected).abs() < 1e-12);
        }
        let sf6 = reg.resolve_first(&Selector::all(["Sulfur hexafluoride"])).unwrap();
        assert!(builder.get(0, sf6, market) < 0.0);
    }

    #[test]
    fn test_hydrogen_market_draws_fuel_preparation_electricity() {
        let mut reg = registry();
        register_markets(&mut reg, &[Powertrain::Fcev], &[2030], "CH");
        let mut builder = TechnologyMatrixBuilder::from_base(&BaseMatrix::new(0), reg.len(), 1).unwrap();
        let spec = FuelBlendSpec {
            primary: FuelType::Electrolysis,
            primary_share: vec![0.5],
            secondary: None,
        };
        let blend = FuelBlend::resolve(FuelFamily::Hydrogen, Some(&spec), &[2030], None).unwrap();

        let bg = background();
        let mut mixer = MarketMixer::new(&reg, &bg, "CH");
        mixer.mix_fuel(&mut builder, &blend).unwrap();

        let market = reg
            .procedural(&ProceduralActivity::FuelMarket {
                family: FuelFamily::Hydrogen,
                year: 2030,
            })
            .unwrap();
        let grid = reg
            .procedural(&ProceduralActivity::ElectricityMarket {
                consumer: ElectricityConsumer::FuelPreparation,
                year: 2030,
            })
            .unwrap();
        let electrolysis = reg
            .resolve_first(&dataset_selector(fuel_dataset(FuelType::Electrolysis)))
            .unwrap();
        let smr = reg
            .resolve_first(&dataset_selector(fuel_dataset(FuelType::SmrNaturalGas)))
            .unwrap();
        assert_eq!(builder.get(0, electrolysis, market), -0.5);
        assert_eq!(builder.get(0, smr, market), -0.5);
        assert_eq!(builder.get(0, grid, market), -29.0);
        assert!(mixer
            .into_assignments()
            .iter()
            .all(|(_, c)| *c == ResultCategory::EnergyChain));
    }

    #[test]
    fn test_fuel_market_mixing_is_idempotent() {
        let mut reg = registry();
        for fuel in FuelFamily::Diesel.members() {
            reg.register(ActivityKey::new(fuel_dataset(fuel), "RER", "kilogram", "diesel"));
        }
        register_markets(&mut reg, &[Powertrain::IcevD], &[2020], "CH");
        let mut builder = TechnologyMatrixBuilder::from_base(&BaseMatrix::new(0), reg.len(), 1).unwrap();
        let blend = FuelBlend::resolve(
            FuelFamily::Diesel,
            Some(&FuelBlendSpec {
                primary: FuelType::Diesel,
                primary_share: vec![0.8],
                secondary: None,
            }),
            &[2020],
            None,
        )
        .unwrap();
        let market = reg
            .procedural(&ProceduralActivity::FuelMarket {
                family: FuelFamily::Diesel,
                year: 2020,
            })
            .unwrap();
        let diesel = reg
            .resolve_first(&dataset_selector(fuel_dataset(FuelType::Diesel)))
            .unwrap();

        let bg = background();
        let mut mixer = MarketMixer::new(&reg, &bg, "CH");
        mixer.mix_fuel(&mut builder, &blend).unwrap();
        let first = builder.get(0, diesel, market);
        mixer.mix_fuel(&mut builder, &blend).unwrap();

        assert_eq!(first, -0.8);
        assert_eq!(builder.get(0, diesel, market), first);
    }

    #[test]
    fn test_ccs_variants_not_confused() {
        let reg = registry();
        let plain = reg
            .resolve_first(&dataset_selector(fuel_dataset(FuelType::SmrNaturalGas)))
            .unwrap();
        let ccs = reg
            .resolve_first(&dataset_selector(fuel_dataset(FuelType::SmrNaturalGasCcs)))
            .unwrap();
        assert_ne!(plain, ccs);
    }
}
