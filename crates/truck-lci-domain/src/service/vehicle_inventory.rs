//! Vehicle inventory: truck manufacture and transport exchanges per vehicle cell

use serde::Serialize;
use tracing::{debug, warn};
use truck_lci_types::{Error, FuelFamily, Powertrain, Result, ResultCategory, Size, WeightTier};

use crate::model::parameters::names;
use crate::model::{
    ActivityRegistry, ElectricityConsumer, FuelBlends, ParamId, ProceduralActivity, Selector,
    VehicleCell, VehicleParameters,
};
use crate::service::matrix_builder::{InjectMode, TechnologyMatrixBuilder, VehicleTarget};

/// Share of transmission mass going to the shaft, gearbox and retarder datasets
const TRANSMISSION_SPLIT: [(&str, f64); 3] = [
    ("transmission, for lorry", 0.52),
    ("gearbox, for lorry", 0.36),
    ("retarder, for lorry", 0.12),
];

/// Road construction, meter-year per kg of driving mass and km
const ROAD_CONSTRUCTION_PER_KG_KM: f64 = 5.37e-7;
/// Road maintenance, meter-year per km
const ROAD_MAINTENANCE_PER_KM: f64 = 1.29e-3;
/// Charging stations last 24 years and are shared between two trucks
const CHARGER_LIFETIME_YEARS: f64 = 24.0;
const CHARGER_SHARING_KWH: f64 = 2100.0;

/// Elementary flow each exhaust pollutant is reported as
const POLLUTANT_FLOWS: [(&str, &str); 11] = [
    ("Hydrocarbons", "Hydrocarbons, aliphatic, alkanes, unspecified"),
    ("Carbon monoxide", "Carbon monoxide, fossil"),
    ("Nitrogen oxides", "Nitrogen oxides"),
    ("Particulate matters", "Particulate Matter, < 2.5 um"),
    ("Nitrogen dioxide", "Nitrogen dioxide"),
    ("Methane", "Methane, fossil"),
    ("NMVOC", "NMVOC, non-methane volatile organic compounds"),
    ("Sulfur dioxide", "Sulfur dioxide"),
    ("Dinitrogen oxide", "Dinitrogen monoxide"),
    ("Ammonia", "Ammonia"),
    ("Benzene", "Benzene"),
];

/// Air compartment each driving segment emits into
fn segment_compartment(segment: &str) -> &'static str {
    match segment {
        "urban" => "urban air close to ground",
        "suburban" => "non-urban air or from high stacks",
        _ => "low population density, long-term",
    }
}

/// Matrix columns of one vehicle cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleColumn {
    pub cell: VehicleCell,
    pub size: Size,
    pub powertrain: Powertrain,
    pub year: u16,
    pub truck: usize,
    pub transport: usize,
}

/// Truck and transport activities registered for every vehicle cell
#[derive(Debug, Clone, Default)]
pub struct VehicleColumns {
    columns: Vec<VehicleColumn>,
}

impl VehicleColumns {
    /// Register one truck and one transport activity per vehicle cell
    pub fn register(
        registry: &mut ActivityRegistry,
        params: &VehicleParameters,
        location: &str,
    ) -> Self {
        let columns: Vec<VehicleColumn> = params
            .cells()
            .map(|cell| {
                let size = params.size_of(cell);
                let powertrain = params.powertrain_of(cell);
                let year = params.year_of(cell);
                let truck = registry.register_procedural(
                    ProceduralActivity::Truck {
                        size,
                        powertrain,
                        year,
                    },
                    location,
                );
                let transport = registry.register_procedural(
                    ProceduralActivity::Transport {
                        size,
                        powertrain,
                        year,
                    },
                    location,
                );
                VehicleColumn {
                    cell,
                    size,
                    powertrain,
                    year,
                    truck,
                    transport,
                }
            })
            .collect();
        debug!(vehicles = columns.len(), "vehicle activities registered");
        Self { columns }
    }

    pub fn iter(&self) -> impl Iterator<Item = &VehicleColumn> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Every truck and transport column, ascending
    pub fn vehicle_block(&self) -> Vec<usize> {
        let mut block: Vec<usize> = self
            .columns
            .iter()
            .flat_map(|c| [c.truck, c.transport])
            .collect();
        block.sort_unstable();
        block.dedup();
        block
    }

    pub fn trucks<P>(&self, predicate: P) -> Vec<VehicleTarget>
    where
        P: Fn(&VehicleColumn) -> bool,
    {
        self.columns
            .iter()
            .filter(|c| predicate(c))
            .map(|c| VehicleTarget {
                cell: c.cell,
                column: c.truck,
            })
            .collect()
    }

    pub fn transports<P>(&self, predicate: P) -> Vec<VehicleTarget>
    where
        P: Fn(&VehicleColumn) -> bool,
    {
        self.columns
            .iter()
            .filter(|c| predicate(c))
            .map(|c| VehicleTarget {
                cell: c.cell,
                column: c.transport,
            })
            .collect()
    }
}

/// What the inventory wrote beyond the coefficients themselves
#[derive(Debug, Clone, Default, Serialize)]
pub struct InventoryReport {
    /// Result category of every product row the inventory fed
    pub assignments: Vec<(usize, ResultCategory)>,
    /// Reference activities that could not be found
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct ParameterIds {
    glider_base_mass: ParamId,
    lightweighting: ParamId,
    suspension_mass: ParamId,
    braking_system_mass: ParamId,
    wheels_and_tires_mass: ParamId,
    exhaust_system_mass: ParamId,
    electrical_system_mass: ParamId,
    transmission_mass: ParamId,
    other_components_mass: ParamId,
    gross_mass: ParamId,
    driving_mass: ParamId,
    converter_mass: ParamId,
    electric_engine_mass: ParamId,
    inverter_mass: ParamId,
    power_distribution_unit_mass: ParamId,
    combustion_engine_mass: ParamId,
    battery_bop_mass: ParamId,
    battery_cell_mass: ParamId,
    battery_replacements: ParamId,
    battery_cell_production_electricity: ParamId,
    fuel_cell_stack_mass: ParamId,
    fuel_cell_replacements: ParamId,
    fuel_tank_mass: ParamId,
    electric_energy_stored: ParamId,
    lifetime_kilometers: ParamId,
    kilometers_per_year: ParamId,
    total_cargo_mass: ParamId,
    ttw_energy: ParamId,
    electricity_consumption: ParamId,
    cng_leakage: ParamId,
    tire_wear: ParamId,
    brake_wear: ParamId,
    road_wear: ParamId,
    refrigerant_charge: ParamId,
    refrigerant_leakage: ParamId,
}

impl ParameterIds {
    fn resolve(p: &VehicleParameters) -> Result<Self> {
        Ok(Self {
            glider_base_mass: p.id(names::GLIDER_BASE_MASS)?,
            lightweighting: p.id(names::LIGHTWEIGHTING)?,
            suspension_mass: p.id(names::SUSPENSION_MASS)?,
            braking_system_mass: p.id(names::BRAKING_SYSTEM_MASS)?,
            wheels_and_tires_mass: p.id(names::WHEELS_AND_TIRES_MASS)?,
            exhaust_system_mass: p.id(names::EXHAUST_SYSTEM_MASS)?,
            electrical_system_mass: p.id(names::ELECTRICAL_SYSTEM_MASS)?,
            transmission_mass: p.id(names::TRANSMISSION_MASS)?,
            other_components_mass: p.id(names::OTHER_COMPONENTS_MASS)?,
            gross_mass: p.id(names::GROSS_MASS)?,
            driving_mass: p.id(names::DRIVING_MASS)?,
            converter_mass: p.id(names::CONVERTER_MASS)?,
            electric_engine_mass: p.id(names::ELECTRIC_ENGINE_MASS)?,
            inverter_mass: p.id(names::INVERTER_MASS)?,
            power_distribution_unit_mass: p.id(names::POWER_DISTRIBUTION_UNIT_MASS)?,
            combustion_engine_mass: p.id(names::COMBUSTION_ENGINE_MASS)?,
            battery_bop_mass: p.id(names::BATTERY_BOP_MASS)?,
            battery_cell_mass: p.id(names::BATTERY_CELL_MASS)?,
            battery_replacements: p.id(names::BATTERY_REPLACEMENTS)?,
            battery_cell_production_electricity: p
                .id(names::BATTERY_CELL_PRODUCTION_ELECTRICITY)?,
            fuel_cell_stack_mass: p.id(names::FUEL_CELL_STACK_MASS)?,
            fuel_cell_replacements: p.id(names::FUEL_CELL_REPLACEMENTS)?,
            fuel_tank_mass: p.id(names::FUEL_TANK_MASS)?,
            electric_energy_stored: p.id(names::ELECTRIC_ENERGY_STORED)?,
            lifetime_kilometers: p.id(names::LIFETIME_KILOMETERS)?,
            kilometers_per_year: p.id(names::KILOMETERS_PER_YEAR)?,
            total_cargo_mass: p.id(names::TOTAL_CARGO_MASS)?,
            ttw_energy: p.id(names::TTW_ENERGY)?,
            electricity_consumption: p.id(names::ELECTRICITY_CONSUMPTION)?,
            cng_leakage: p.id(names::CNG_LEAKAGE)?,
            tire_wear: p.id(names::TIRE_WEAR)?,
            brake_wear: p.id(names::BRAKE_WEAR)?,
            road_wear: p.id(names::ROAD_WEAR)?,
            refrigerant_charge: p.id(names::REFRIGERANT_CHARGE)?,
            refrigerant_leakage: p.id(names::REFRIGERANT_LEAKAGE)?,
        })
    }
}

/// Read-only view handed to coefficient closures
#[derive(Clone, Copy)]
struct Ctx<'a> {
    params: &'a VehicleParameters,
    blends: &'a FuelBlends,
    ids: ParameterIds,
}

impl Ctx<'_> {
    fn cargo_t(&self, c: VehicleCell, s: usize) -> f64 {
        self.params.value(self.ids.total_cargo_mass, c, s) / 1000.0
    }

    /// Fuel kg per km, from tank-to-wheel energy (kJ/km) and the blend's heating value
    fn fuel_kg_per_km(&self, family: FuelFamily, c: VehicleCell, s: usize) -> f64 {
        let lhv = self
            .blends
            .get(family)
            .map(|b| b.lhv_mj_per_kg(c.year))
            .unwrap_or(0.0);
        self.params.value(self.ids.ttw_energy, c, s) / 1000.0 / lhv
    }
}

/// Writes every vehicle exchange into a technology matrix under construction
pub struct VehicleInventory<'a> {
    registry: &'a ActivityRegistry,
    params: &'a VehicleParameters,
    columns: &'a VehicleColumns,
    blends: &'a FuelBlends,
    ids: ParameterIds,
    report: InventoryReport,
}

impl<'a> VehicleInventory<'a> {
    /// Fails when a required parameter is missing or a blend does not cover
    /// the calculation years
    pub fn new(
        registry: &'a ActivityRegistry,
        params: &'a VehicleParameters,
        columns: &'a VehicleColumns,
        blends: &'a FuelBlends,
    ) -> Result<Self> {
        params.require_all(&names::required())?;
        for blend in blends.iter() {
            if blend.years() != params.years() {
                return Err(Error::DimensionMismatch(format!(
                    "{} blend covers {:?}, parameters cover {:?}",
                    blend.family(),
                    blend.years(),
                    params.years()
                )));
            }
        }
        Ok(Self {
            registry,
            params,
            columns,
            blends,
            ids: ParameterIds::resolve(params)?,
            report: InventoryReport::default(),
        })
    }

    pub fn inject(mut self, builder: &mut TechnologyMatrixBuilder) -> Result<InventoryReport> {
        self.glider(builder);
        self.powertrain(builder);
        self.energy_storage(builder)?;
        self.maintenance_and_end_of_life(builder);
        self.charging_infrastructure(builder);
        self.transport(builder);
        self.energy_supply(builder)?;
        self.exhaust(builder)?;
        self.non_exhaust(builder);
        self.noise(builder)?;
        self.refrigerant(builder);
        self.road(builder);
        debug!(
            assignments = self.report.assignments.len(),
            missing = self.report.missing.len(),
            "vehicle inventory injected"
        );
        Ok(self.report)
    }

    fn ctx(&self) -> Ctx<'a> {
        Ctx {
            params: self.params,
            blends: self.blends,
            ids: self.ids,
        }
    }

    fn reference(&mut self, selector: Selector, category: ResultCategory) -> Option<usize> {
        match self.registry.resolve_first(&selector) {
            Some(idx) => {
                self.report.assignments.push((idx, category));
                Some(idx)
            }
            None => {
                warn!(%selector, "reference activity not found, exchange skipped");
                self.report.missing.push(selector.to_string());
                None
            }
        }
    }

    fn procedural(&mut self, activity: ProceduralActivity, category: ResultCategory) -> Result<usize> {
        let idx = self.registry.require_procedural(&activity)?;
        self.report.assignments.push((idx, category));
        Ok(idx)
    }

    fn component<F>(
        &mut self,
        builder: &mut TechnologyMatrixBuilder,
        selector: Selector,
        category: ResultCategory,
        targets: &[VehicleTarget],
        mode: InjectMode,
        value: F,
    ) where
        F: Fn(VehicleCell, usize) -> f64,
    {
        if targets.is_empty() {
            return;
        }
        if let Some(product) = self.reference(selector, category) {
            builder.inject(product, targets, mode, value);
        }
    }

    fn glider(&mut self, builder: &mut TechnologyMatrixBuilder) {
        let (p, ids) = (self.params, self.ids);
        let all = self.columns.trucks(|_| true);

        self.component(
            builder,
            Selector::all(["frame, blanks and saddle, for lorry"]),
            ResultCategory::Glider,
            &all,
            InjectMode::Set,
            |c, s| -p.value(ids.glider_base_mass, c, s),
        );
        self.component(
            builder,
            Selector::all(["suspension, for lorry"]),
            ResultCategory::Glider,
            &all,
            InjectMode::Set,
            |c, s| -(p.value(ids.suspension_mass, c, s) + p.value(ids.braking_system_mass, c, s)),
        );
        self.component(
            builder,
            Selector::all(["tires and wheels, for lorry"]),
            ResultCategory::Glider,
            &all,
            InjectMode::Set,
            |c, s| -p.value(ids.wheels_and_tires_mass, c, s),
        );
        self.component(
            builder,
            Selector::all(["Glider lightweighting"]),
            ResultCategory::Glider,
            &all,
            InjectMode::Set,
            |c, s| -p.value(ids.lightweighting, c, s) * p.value(ids.glider_base_mass, c, s),
        );

        let combustion = self.columns.trucks(|c| c.powertrain.is_combustion());
        self.component(
            builder,
            Selector::all(["other components, for hybrid electric lorry"]),
            ResultCategory::Glider,
            &combustion,
            InjectMode::Set,
            |c, s| -p.value(ids.other_components_mass, c, s),
        );
        let electric = self.columns.trucks(|c| c.powertrain.is_electric_drive());
        self.component(
            builder,
            Selector::all(["other components, for electric lorry"]),
            ResultCategory::Glider,
            &electric,
            InjectMode::Set,
            |c, s| -p.value(ids.other_components_mass, c, s),
        );
    }

    fn powertrain(&mut self, builder: &mut TechnologyMatrixBuilder) {
        let (p, ids) = (self.params, self.ids);
        let all = self.columns.trucks(|_| true);

        self.component(
            builder,
            Selector::all(["exhaust system, for lorry"]),
            ResultCategory::Powertrain,
            &all,
            InjectMode::Set,
            |c, s| -p.value(ids.exhaust_system_mass, c, s),
        );
        self.component(
            builder,
            Selector::all(["power electronics, for lorry"]),
            ResultCategory::Powertrain,
            &all,
            InjectMode::Set,
            |c, s| -p.value(ids.electrical_system_mass, c, s),
        );
        for (dataset, share) in TRANSMISSION_SPLIT {
            self.component(
                builder,
                Selector::all([dataset]),
                ResultCategory::Powertrain,
                &all,
                InjectMode::Set,
                |c, s| -p.value(ids.transmission_mass, c, s) * share,
            );
        }

        let electric_parts = [
            ("market for converter, for electric passenger car", ids.converter_mass),
            ("market for electric motor, electric passenger car", ids.electric_engine_mass),
            ("market for inverter, for electric passenger car", ids.inverter_mass),
            (
                "market for power distribution unit, for electric passenger car",
                ids.power_distribution_unit_mass,
            ),
            ("internal combustion engine, for lorry", ids.combustion_engine_mass),
        ];
        for (dataset, mass) in electric_parts {
            self.component(
                builder,
                Selector::all([dataset]),
                ResultCategory::Powertrain,
                &all,
                InjectMode::Set,
                |c, s| -p.value(mass, c, s),
            );
        }

        let fuel_cell = self.columns.trucks(|c| c.powertrain == Powertrain::Fcev);
        self.component(
            builder,
            Selector::all(["fuel cell stack, for lorry"]),
            ResultCategory::Powertrain,
            &fuel_cell,
            InjectMode::Set,
            |c, s| {
                -p.value(ids.fuel_cell_stack_mass, c, s)
                    * (1.0 + p.value(ids.fuel_cell_replacements, c, s))
            },
        );
    }

    fn energy_storage(&mut self, builder: &mut TechnologyMatrixBuilder) -> Result<()> {
        let (p, ids) = (self.params, self.ids);
        let with_replacements = move |mass: ParamId, c: VehicleCell, s: usize| {
            p.value(mass, c, s) * (1.0 + p.value(ids.battery_replacements, c, s))
        };

        // Starter battery: BoP and cells accumulate into one lead-acid exchange
        let starter = self
            .columns
            .trucks(|c| c.powertrain.has_starter_battery_only());
        for part in [ids.battery_bop_mass, ids.battery_cell_mass] {
            self.component(
                builder,
                Selector::all(["lead acid battery, for lorry"]),
                ResultCategory::EnergyStorage,
                &starter,
                InjectMode::Add,
                |c, s| -with_replacements(part, c, s),
            );
        }

        let traction = self
            .columns
            .trucks(|c| !c.powertrain.has_starter_battery_only());
        self.component(
            builder,
            Selector::all(["battery management system", "Li-ion"]),
            ResultCategory::EnergyStorage,
            &traction,
            InjectMode::Set,
            |c, s| -with_replacements(ids.battery_bop_mass, c, s),
        );
        self.component(
            builder,
            Selector::all(["battery cell", "Li-ion"]),
            ResultCategory::EnergyStorage,
            &traction,
            InjectMode::Set,
            |c, s| -with_replacements(ids.battery_cell_mass, c, s),
        );
        for (yi, &year) in p.years().iter().enumerate() {
            let targets = self
                .columns
                .trucks(|c| c.cell.year == yi && !c.powertrain.has_starter_battery_only());
            if targets.is_empty() {
                continue;
            }
            let market = self.procedural(
                ProceduralActivity::ElectricityMarket {
                    consumer: ElectricityConsumer::BatteryProduction,
                    year,
                },
                ResultCategory::EnergyStorage,
            )?;
            builder.inject(market, &targets, InjectMode::Set, |c, s| {
                -with_replacements(ids.battery_cell_mass, c, s)
                    * p.value(ids.battery_cell_production_electricity, c, s)
            });
        }

        let tanks = [
            (Powertrain::Fcev, "hydrogen tank, for lorry"),
            (Powertrain::IcevG, "fuel tank, compressed natural gas"),
        ];
        for (powertrain, dataset) in tanks {
            let targets = self.columns.trucks(|c| c.powertrain == powertrain);
            self.component(
                builder,
                Selector::all([dataset]),
                ResultCategory::EnergyStorage,
                &targets,
                InjectMode::Set,
                |c, s| -p.value(ids.fuel_tank_mass, c, s),
            );
        }
        let diesel = self
            .columns
            .trucks(|c| c.powertrain.fuel_family() == Some(FuelFamily::Diesel));
        self.component(
            builder,
            Selector::all(["fuel tank, for diesel vehicle"]),
            ResultCategory::EnergyStorage,
            &diesel,
            InjectMode::Set,
            |c, s| -p.value(ids.fuel_tank_mass, c, s),
        );
        Ok(())
    }

    fn maintenance_and_end_of_life(&mut self, builder: &mut TechnologyMatrixBuilder) {
        let (p, ids) = (self.params, self.ids);
        for tier in [WeightTier::Light, WeightTier::Medium, WeightTier::Heavy] {
            let targets = self.columns.trucks(|c| c.size.weight_tier() == tier);
            let reference_kg = tier.reference_mass_t() * 1000.0;
            self.component(
                builder,
                Selector::all(["maintenance, lorry", tier.dataset_label()]),
                ResultCategory::Maintenance,
                &targets,
                InjectMode::Set,
                |c, s| -p.value(ids.gross_mass, c, s) / reference_kg,
            );
            // Waste treatment: positive by convention
            self.component(
                builder,
                Selector::all(["treatment of used lorry", tier.dataset_label()]),
                ResultCategory::EndOfLife,
                &targets,
                InjectMode::Set,
                |c, s| p.value(ids.gross_mass, c, s) / reference_kg,
            );
        }
    }

    fn charging_infrastructure(&mut self, builder: &mut TechnologyMatrixBuilder) {
        let (p, ids) = (self.params, self.ids);
        let plugin = self.columns.trucks(|c| c.powertrain.is_plugin());
        self.component(
            builder,
            Selector::all(["EV charger, level 3, plugin, 200 kW"]),
            ResultCategory::EnergyChain,
            &plugin,
            InjectMode::Set,
            |c, s| {
                let trucks_served = CHARGER_SHARING_KWH / p.value(ids.electric_energy_stored, c, s);
                -1.0 / (CHARGER_LIFETIME_YEARS
                    * trucks_served
                    * p.value(ids.kilometers_per_year, c, s))
            },
        );
    }

    /// One ton-km requires 1 / (lifetime km × cargo t) trucks
    fn transport(&mut self, builder: &mut TechnologyMatrixBuilder) {
        let x = self.ctx();
        let (p, ids) = (self.params, self.ids);
        for column in self.columns.iter() {
            let target = [VehicleTarget {
                cell: column.cell,
                column: column.transport,
            }];
            builder.inject(column.truck, &target, InjectMode::Set, |c, s| {
                -1.0 / (p.value(ids.lifetime_kilometers, c, s) * x.cargo_t(c, s))
            });
        }
    }

    fn energy_supply(&mut self, builder: &mut TechnologyMatrixBuilder) -> Result<()> {
        let x = self.ctx();
        let (p, ids) = (self.params, self.ids);
        for (yi, &year) in p.years().iter().enumerate() {
            for family in FuelFamily::ALL {
                let targets = self
                    .columns
                    .transports(|c| c.cell.year == yi && c.powertrain.fuel_family() == Some(family));
                if targets.is_empty() {
                    continue;
                }
                let market = self.procedural(
                    ProceduralActivity::FuelMarket { family, year },
                    ResultCategory::EnergyChain,
                )?;
                builder.inject(market, &targets, InjectMode::Set, |c, s| {
                    -x.fuel_kg_per_km(family, c, s) / x.cargo_t(c, s)
                });
            }

            let plugin = self
                .columns
                .transports(|c| c.cell.year == yi && c.powertrain.is_plugin());
            if !plugin.is_empty() {
                let market = self.procedural(
                    ProceduralActivity::ElectricityMarket {
                        consumer: ElectricityConsumer::VehicleCharging,
                        year,
                    },
                    ResultCategory::EnergyChain,
                )?;
                builder.inject(market, &plugin, InjectMode::Set, |c, s| {
                    -p.value(ids.electricity_consumption, c, s) / x.cargo_t(c, s)
                });
            }

            // Pump-to-tank leakage: more gas is supplied than burnt
            let gas = self
                .columns
                .transports(|c| c.cell.year == yi && c.powertrain == Powertrain::IcevG);
            if !gas.is_empty() {
                let market = self
                    .registry
                    .require_procedural(&ProceduralActivity::FuelMarket {
                        family: FuelFamily::Cng,
                        year,
                    })?;
                builder.inject(market, &gas, InjectMode::Scale, |c, s| {
                    1.0 + p.value(ids.cng_leakage, c, s)
                });
            }
        }

        let gas = self.columns.transports(|c| c.powertrain == Powertrain::IcevG);
        self.component(
            builder,
            Selector::all(["Methane, fossil"]).in_location("air"),
            ResultCategory::DirectExhaust,
            &gas,
            InjectMode::Add,
            |c, s| {
                -x.fuel_kg_per_km(FuelFamily::Cng, c, s) * p.value(ids.cng_leakage, c, s)
                    / x.cargo_t(c, s)
            },
        );
        Ok(())
    }

    fn exhaust(&mut self, builder: &mut TechnologyMatrixBuilder) -> Result<()> {
        let x = self.ctx();
        let p = self.params;
        for family in [FuelFamily::Diesel, FuelFamily::Cng] {
            let Some(blend) = x.blends.get(family) else {
                continue;
            };
            let targets = self
                .columns
                .transports(|c| c.powertrain.fuel_family() == Some(family));
            self.component(
                builder,
                Selector::all(["Carbon dioxide, fossil"]).in_location("air"),
                ResultCategory::DirectExhaust,
                &targets,
                InjectMode::Add,
                |c, s| {
                    -x.fuel_kg_per_km(family, c, s) * blend.co2_fossil_kg_per_kg(c.year)
                        / x.cargo_t(c, s)
                },
            );
            self.component(
                builder,
                Selector::all(["Carbon dioxide, non-fossil"]).in_location("air"),
                ResultCategory::DirectExhaust,
                &targets,
                InjectMode::Add,
                |c, s| {
                    -x.fuel_kg_per_km(family, c, s) * blend.co2_non_fossil_kg_per_kg(c.year)
                        / x.cargo_t(c, s)
                },
            );
        }

        let combustion = self.columns.transports(|c| c.powertrain.is_combustion());
        for (pollutant, flow) in POLLUTANT_FLOWS {
            for segment in names::DRIVING_SEGMENTS {
                let param = p.id(&names::exhaust_parameter(pollutant, segment))?;
                self.component(
                    builder,
                    Selector::all([flow]).in_location(segment_compartment(segment)),
                    ResultCategory::DirectExhaust,
                    &combustion,
                    InjectMode::Add,
                    |c, s| -p.value(param, c, s) / x.cargo_t(c, s),
                );
            }
        }
        Ok(())
    }

    /// Abrasion particles go to waste-treatment datasets, hence positive
    fn non_exhaust(&mut self, builder: &mut TechnologyMatrixBuilder) {
        let x = self.ctx();
        let (p, ids) = (self.params, self.ids);
        let all = self.columns.transports(|_| true);
        let wear = [
            ("treatment of tyre wear emissions, lorry", ids.tire_wear),
            ("treatment of brake wear emissions, lorry", ids.brake_wear),
            ("treatment of road wear emissions, lorry", ids.road_wear),
        ];
        for (dataset, param) in wear {
            self.component(
                builder,
                Selector::all([dataset]),
                ResultCategory::DirectNonExhaust,
                &all,
                InjectMode::Set,
                |c, s| p.value(param, c, s) / x.cargo_t(c, s),
            );
        }
    }

    fn noise(&mut self, builder: &mut TechnologyMatrixBuilder) -> Result<()> {
        let x = self.ctx();
        let p = self.params;
        let all = self.columns.transports(|_| true);
        for segment in names::DRIVING_SEGMENTS {
            for octave in 1..=names::NOISE_OCTAVES {
                let flow = names::noise_parameter(octave, segment);
                let param = p.id(&flow)?;
                self.component(
                    builder,
                    Selector::all([flow]),
                    ResultCategory::DirectNonExhaust,
                    &all,
                    InjectMode::Set,
                    |c, s| -p.value(param, c, s) / x.cargo_t(c, s),
                );
            }
        }
        Ok(())
    }

    /// A/C refrigerant: the initial charge plus yearly top-ups is supplied
    /// over the vehicle lifetime, and all of it ends up in the air
    fn refrigerant(&mut self, builder: &mut TechnologyMatrixBuilder) {
        let x = self.ctx();
        let (p, ids) = (self.params, self.ids);
        let all = self.columns.transports(|_| true);
        let per_km = move |c: VehicleCell, s: usize| {
            let charge = p.value(ids.refrigerant_charge, c, s);
            charge / p.value(ids.lifetime_kilometers, c, s)
                + charge * p.value(ids.refrigerant_leakage, c, s)
                    / p.value(ids.kilometers_per_year, c, s)
        };
        self.component(
            builder,
            Selector::all(["market for refrigerant R134a"]),
            ResultCategory::Maintenance,
            &all,
            InjectMode::Set,
            |c, s| -per_km(c, s) / x.cargo_t(c, s),
        );
        self.component(
            builder,
            Selector::all(["Ethane, 1,1,1,2-tetrafluoro-, HFC-134a"]).in_location("air"),
            ResultCategory::DirectNonExhaust,
            &all,
            InjectMode::Set,
            |c, s| -per_km(c, s) / x.cargo_t(c, s),
        );
    }

    fn road(&mut self, builder: &mut TechnologyMatrixBuilder) {
        let x = self.ctx();
        let (p, ids) = (self.params, self.ids);
        let all = self.columns.transports(|_| true);
        self.component(
            builder,
            Selector::all(["market for road"]).excluding(["maintenance"]),
            ResultCategory::Road,
            &all,
            InjectMode::Set,
            |c, s| -ROAD_CONSTRUCTION_PER_KG_KM * p.value(ids.driving_mass, c, s) / x.cargo_t(c, s),
        );
        self.component(
            builder,
            Selector::all(["market for road maintenance"]),
            ResultCategory::Road,
            &all,
            InjectMode::Set,
            |c, s| -ROAD_MAINTENANCE_PER_KM / x.cargo_t(c, s),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ActivityKey;
    use crate::service::test_support::*;
    use truck_lci_types::FuelType;

    fn column(fx: &Fixture, powertrain: Powertrain) -> VehicleColumn {
        *fx.columns
            .iter()
            .find(|c| c.powertrain == powertrain)
            .unwrap()
    }

    #[test]
    fn test_columns_registered_per_cell() {
        let fx = fixture();
        assert_eq!(fx.columns.len(), 2);
        let block = fx.columns.vehicle_block();
        assert_eq!(block.len(), 4);
        assert!(block.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(fx.columns.trucks(|c| c.powertrain.is_plugin()).len(), 1);
    }

    #[test]
    fn test_coefficients_written() {
        let fx = fixture();
        let solved = solve(&fx);
        let m = &solved.matrix;
        let diesel = column(&fx, Powertrain::IcevD);
        let bev = column(&fx, Powertrain::Bev);
        let cargo_t = CARGO_KG / 1000.0;

        assert_eq!(m.get(0, FRAME, diesel.truck), -GLIDER_KG);
        assert_eq!(m.get(1, FRAME, bev.truck), -GLIDER_KG);
        let per_tkm = 1.0 / (LIFETIME_KM * cargo_t);
        assert!((m.get(0, diesel.truck, diesel.transport) + per_tkm).abs() < 1e-18);

        let market = fx
            .registry
            .procedural(&ProceduralActivity::FuelMarket {
                family: FuelFamily::Diesel,
                year: 2020,
            })
            .unwrap();
        let fuel_kg = TTW_KJ_PER_KM / 1000.0 / FuelType::Diesel.lhv_mj_per_kg() / cargo_t;
        assert!((m.get(0, market, diesel.transport) + fuel_kg).abs() < 1e-12);
        assert!(
            (m.get(0, CO2_FOSSIL, diesel.transport) + fuel_kg * FuelType::Diesel.co2_kg_per_kg())
                .abs()
                < 1e-12
        );
        assert_eq!(m.get(0, CO2_NON_FOSSIL, diesel.transport), 0.0);
        assert_eq!(m.get(0, market, bev.transport), 0.0);

        let battery = fx
            .registry
            .procedural(&ProceduralActivity::ElectricityMarket {
                consumer: ElectricityConsumer::BatteryProduction,
                year: 2020,
            })
            .unwrap();
        assert_eq!(m.get(0, battery, bev.truck), -BATTERY_CELL_KG * CELL_KWH_PER_KG);
        assert_eq!(m.get(0, battery, diesel.truck), 0.0);
    }

    #[test]
    fn test_report_lists_assignments_and_missing_datasets() {
        let fx = fixture();
        let report = solve(&fx).report;
        assert!(report.assignments.contains(&(FRAME, ResultCategory::Glider)));
        assert!(report
            .assignments
            .contains(&(CO2_FOSSIL, ResultCategory::DirectExhaust)));
        assert!(report
            .missing
            .iter()
            .any(|m| m.contains("lead acid battery, for lorry")));
        assert!(report.missing.iter().any(|m| m.contains("market for road")));
    }

    #[test]
    fn test_noise_written_per_octave_and_segment() {
        let mut fx = fixture();
        let urban = fx
            .registry
            .register(ActivityKey::flow("noise, octave 3, day time, urban", "octave 3", "joule"));
        let suburban = fx.registry.register(ActivityKey::flow(
            "noise, octave 3, day time, suburban",
            "octave 3",
            "joule",
        ));
        let bev_cell = fx.params.cell_of(Size::T40, Powertrain::Bev, 2020).unwrap();
        fx.params
            .fill_cell(&names::noise_parameter(3, "urban"), bev_cell, 400.0)
            .unwrap();
        fx.params
            .fill_cell(&names::noise_parameter(3, "suburban"), bev_cell, 100.0)
            .unwrap();

        let solved = solve(&fx);
        let m = &solved.matrix;
        let bev = column(&fx, Powertrain::Bev);
        let diesel = column(&fx, Powertrain::IcevD);
        let cargo_t = CARGO_KG / 1000.0;
        assert_eq!(m.get(0, urban, bev.transport), -400.0 / cargo_t);
        assert_eq!(m.get(1, suburban, bev.transport), -100.0 / cargo_t);
        assert_eq!(m.get(0, urban, diesel.transport), 0.0);
        assert!(solved
            .report
            .assignments
            .contains(&(urban, ResultCategory::DirectNonExhaust)));
        assert!(solved
            .report
            .missing
            .iter()
            .any(|m| m.contains("noise, octave 8, day time, rural")));
    }

    #[test]
    fn test_refrigerant_supply_and_leakage() {
        let mut fx = fixture();
        let supply = fx.registry.register(ActivityKey::new(
            "market for refrigerant R134a",
            "GLO",
            "kilogram",
            "refrigerant R134a",
        ));
        let hfc = fx.registry.register(ActivityKey::flow(
            "Ethane, 1,1,1,2-tetrafluoro-, HFC-134a",
            "air",
            "kilogram",
        ));
        fx.params.fill(names::REFRIGERANT_CHARGE, 1.0).unwrap();
        fx.params.fill(names::REFRIGERANT_LEAKAGE, 0.1).unwrap();

        let solved = solve(&fx);
        let m = &solved.matrix;
        let diesel = column(&fx, Powertrain::IcevD);
        let cargo_t = CARGO_KG / 1000.0;
        // 1 kg over 1,000,000 km plus 0.1 kg per 100,000 km
        let expected = -(1.0 / LIFETIME_KM + 0.1 / 100_000.0) / cargo_t;
        assert!((m.get(0, supply, diesel.transport) - expected).abs() < 1e-18);
        assert!((m.get(1, hfc, diesel.transport) - expected).abs() < 1e-18);
        assert!(solved
            .report
            .assignments
            .contains(&(supply, ResultCategory::Maintenance)));
        assert!(solved
            .report
            .assignments
            .contains(&(hfc, ResultCategory::DirectNonExhaust)));
    }

    #[test]
    fn test_missing_parameter_rejected() {
        let fx = fixture();
        let sparse = VehicleParameters::new(
            vec![names::GROSS_MASS.to_string()],
            vec![Size::T40],
            vec![Powertrain::IcevD],
            vec![2020],
            1,
        );
        let result = VehicleInventory::new(&fx.registry, &sparse, &fx.columns, &fx.blends);
        assert!(matches!(result, Err(Error::UnknownParameter(_))));
    }

    #[test]
    fn test_blend_years_must_match_parameters() {
        let fx = fixture();
        let blends = FuelBlends::resolve(&Default::default(), &[2020, 2030], None).unwrap();
        let result = VehicleInventory::new(&fx.registry, &fx.params, &fx.columns, &blends);
        assert!(matches!(result, Err(Error::DimensionMismatch(_))));
    }
}
