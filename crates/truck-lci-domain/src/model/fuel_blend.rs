//! Fuel blends: primary/secondary fuel pathways per family and year

use std::collections::HashMap;

use truck_lci_types::{ConfigError, FuelFamily, FuelType, Result};

use super::interpolation::{interpolate, Extrapolation};

/// Blend as configured by the caller, before defaults are applied
#[derive(Debug, Clone, PartialEq)]
pub struct FuelBlendSpec {
    pub primary: FuelType,
    /// One share per calculation year, or a single share for every year
    pub primary_share: Vec<f64>,
    pub secondary: Option<FuelType>,
}

/// Resolved two-component blend for one fuel family
#[derive(Debug, Clone, PartialEq)]
pub struct FuelBlend {
    family: FuelFamily,
    years: Vec<u16>,
    primary: FuelType,
    secondary: FuelType,
    primary_share: Vec<f64>,
    secondary_share: Vec<f64>,
}

impl FuelBlend {
    /// Resolve the blend for `family` over `years`.
    ///
    /// Without a configured blend, the family's default pair is used and the secondary
    /// share is taken from `biofuel_share` (zero when absent). With one,
    /// a missing secondary falls back to the family default, or to the first
    /// other member of the family when the default equals the primary.
    pub fn resolve(
        family: FuelFamily,
        spec: Option<&FuelBlendSpec>,
        years: &[u16],
        biofuel_share: Option<&[f64]>,
    ) -> Result<Self> {
        let (default_primary, default_secondary) = family.default_pair();

        let Some(spec) = spec else {
            let secondary_share: Vec<f64> = match biofuel_share {
                Some(shares) => {
                    check_length(family, shares, years.len())?;
                    broadcast(shares, years.len())
                }
                None => vec![0.0; years.len()],
            };
            for &share in &secondary_share {
                check_share(family, share)?;
            }
            return Ok(Self {
                family,
                years: years.to_vec(),
                primary: default_primary,
                secondary: default_secondary,
                primary_share: secondary_share.iter().map(|s| 1.0 - s).collect(),
                secondary_share,
            });
        };

        check_family(family, spec.primary)?;
        let secondary = match spec.secondary {
            Some(secondary) => {
                check_family(family, secondary)?;
                if secondary == spec.primary {
                    return Err(ConfigError::SameFuelTypes(family.to_string()).into());
                }
                secondary
            }
            None if default_secondary != spec.primary => default_secondary,
            None => family
                .members()
                .into_iter()
                .find(|fuel| *fuel != spec.primary)
                .ok_or_else(|| ConfigError::SameFuelTypes(family.to_string()))?,
        };

        check_length(family, &spec.primary_share, years.len())?;
        let primary_share = broadcast(&spec.primary_share, years.len());
        for &share in &primary_share {
            check_share(family, share)?;
        }

        Ok(Self {
            family,
            years: years.to_vec(),
            primary: spec.primary,
            secondary,
            secondary_share: primary_share.iter().map(|s| 1.0 - s).collect(),
            primary_share,
        })
    }

    pub fn family(&self) -> FuelFamily {
        self.family
    }

    pub fn years(&self) -> &[u16] {
        &self.years
    }

    pub fn primary(&self) -> FuelType {
        self.primary
    }

    pub fn secondary(&self) -> FuelType {
        self.secondary
    }

    /// (fuel, share) pairs for the year at position `year_idx`
    pub fn components(&self, year_idx: usize) -> [(FuelType, f64); 2] {
        [
            (self.primary, self.primary_share[year_idx]),
            (self.secondary, self.secondary_share[year_idx]),
        ]
    }

    pub fn position(&self, year: u16) -> Option<usize> {
        self.years.iter().position(|&y| y == year)
    }

    /// Mass-weighted lower heating value, MJ/kg
    pub fn lhv_mj_per_kg(&self, year_idx: usize) -> f64 {
        self.components(year_idx)
            .iter()
            .map(|(fuel, share)| share * fuel.lhv_mj_per_kg())
            .sum()
    }

    /// Tailpipe CO2 of fossil origin per kg of blend
    pub fn co2_fossil_kg_per_kg(&self, year_idx: usize) -> f64 {
        self.components(year_idx)
            .iter()
            .filter(|(fuel, _)| fuel.is_fossil())
            .map(|(fuel, share)| share * fuel.co2_kg_per_kg())
            .sum()
    }

    /// Tailpipe CO2 of biogenic or synthetic origin per kg of blend
    pub fn co2_non_fossil_kg_per_kg(&self, year_idx: usize) -> f64 {
        self.components(year_idx)
            .iter()
            .filter(|(fuel, _)| !fuel.is_fossil())
            .map(|(fuel, share)| share * fuel.co2_kg_per_kg())
            .sum()
    }
}

fn check_family(family: FuelFamily, fuel: FuelType) -> Result<()> {
    if fuel.family() != family {
        return Err(ConfigError::FuelFamilyMismatch {
            fuel: fuel.to_string(),
            family: family.to_string(),
        }
        .into());
    }
    Ok(())
}

fn check_length(family: FuelFamily, shares: &[f64], expected: usize) -> Result<()> {
    if shares.len() == 1 || shares.len() == expected {
        return Ok(());
    }
    Err(ConfigError::ShareLength {
        family: family.to_string(),
        expected,
        found: shares.len(),
    }
    .into())
}

fn check_share(family: FuelFamily, share: f64) -> Result<()> {
    if (0.0..=1.0).contains(&share) {
        return Ok(());
    }
    Err(ConfigError::InvalidShare {
        family: family.to_string(),
        share,
    }
    .into())
}

fn broadcast(shares: &[f64], len: usize) -> Vec<f64> {
    if shares.len() == 1 {
        vec![shares[0]; len]
    } else {
        shares.to_vec()
    }
}

/// Resolved blends for every fuel family in scope
#[derive(Debug, Clone, Default)]
pub struct FuelBlends {
    blends: HashMap<FuelFamily, FuelBlend>,
}

impl FuelBlends {
    /// Resolve every family from the configured specs and regional biofuel shares
    pub fn resolve(
        specs: &HashMap<FuelFamily, FuelBlendSpec>,
        years: &[u16],
        biofuel: Option<&[f64]>,
    ) -> Result<Self> {
        let mut blends = HashMap::new();
        for family in FuelFamily::ALL {
            // Regional biofuel shares only apply to the liquid and gaseous families
            let share = match family {
                FuelFamily::Hydrogen => None,
                _ => biofuel,
            };
            let blend = FuelBlend::resolve(family, specs.get(&family), years, share)?;
            blends.insert(family, blend);
        }
        Ok(Self { blends })
    }

    pub fn get(&self, family: FuelFamily) -> Option<&FuelBlend> {
        self.blends.get(&family)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FuelBlend> {
        FuelFamily::ALL.iter().filter_map(|f| self.blends.get(f))
    }
}

/// Regional share of biofuel in the liquid/gaseous fuel supply
#[derive(Debug, Clone, Default)]
pub struct BiofuelShares {
    regions: HashMap<String, (Vec<u16>, Vec<f64>)>,
}

impl BiofuelShares {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the share for `region` in `year`; years may arrive unordered
    pub fn insert(&mut self, region: &str, year: u16, share: f64) {
        let (years, shares) = self.regions.entry(region.to_string()).or_default();
        let at = years.partition_point(|&y| y < year);
        if years.get(at) == Some(&year) {
            shares[at] = share;
        } else {
            years.insert(at, year);
            shares.insert(at, share);
        }
    }

    /// Shares at `years`, interpolated and held constant outside the table
    pub fn shares_for(&self, region: &str, years: &[u16]) -> Option<Vec<f64>> {
        let (ref_years, shares) = self.regions.get(region)?;
        Some(
            years
                .iter()
                .map(|&y| interpolate(ref_years, shares, y, Extrapolation::Clamp).clamp(0.0, 1.0))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use truck_lci_types::Error;

    const YEARS: [u16; 2] = [2020, 2030];

    #[test]
    fn test_unconfigured_family_uses_default_pair() {
        let blend = FuelBlend::resolve(FuelFamily::Diesel, None, &YEARS, Some(&[0.05, 0.1][..])).unwrap();
        assert_eq!(blend.primary(), FuelType::Diesel);
        assert_eq!(blend.secondary(), FuelType::BiodieselCookingOil);
        assert!((blend.components(1)[0].1 - 0.9).abs() < 1e-12);

        let blend = FuelBlend::resolve(FuelFamily::Cng, None, &YEARS, None).unwrap();
        assert_eq!(blend.components(0)[1].1, 0.0);
    }

    #[test]
    fn test_missing_secondary_avoids_primary() {
        let spec = FuelBlendSpec {
            primary: FuelType::BiodieselCookingOil,
            primary_share: vec![0.7],
            secondary: None,
        };
        let blend = FuelBlend::resolve(FuelFamily::Diesel, Some(&spec), &YEARS, None).unwrap();
        assert_eq!(blend.secondary(), FuelType::Diesel);
        assert!((blend.components(0)[1].1 - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_specs_rejected() {
        let same = FuelBlendSpec {
            primary: FuelType::Diesel,
            primary_share: vec![0.5],
            secondary: Some(FuelType::Diesel),
        };
        assert!(matches!(
            FuelBlend::resolve(FuelFamily::Diesel, Some(&same), &YEARS, None),
            Err(Error::Config(ConfigError::SameFuelTypes(_)))
        ));

        let foreign = FuelBlendSpec {
            primary: FuelType::Electrolysis,
            primary_share: vec![1.0],
            secondary: None,
        };
        assert!(matches!(
            FuelBlend::resolve(FuelFamily::Diesel, Some(&foreign), &YEARS, None),
            Err(Error::Config(ConfigError::FuelFamilyMismatch { .. }))
        ));

        let short = FuelBlendSpec {
            primary: FuelType::Diesel,
            primary_share: vec![0.5, 0.6, 0.7],
            secondary: None,
        };
        assert!(matches!(
            FuelBlend::resolve(FuelFamily::Diesel, Some(&short), &YEARS, None),
            Err(Error::Config(ConfigError::ShareLength { .. }))
        ));
    }

    #[test]
    fn test_diesel_only_blend_has_no_biogenic_co2() {
        let spec = FuelBlendSpec {
            primary: FuelType::Diesel,
            primary_share: vec![1.0],
            secondary: None,
        };
        let blend = FuelBlend::resolve(FuelFamily::Diesel, Some(&spec), &YEARS, None).unwrap();
        assert!((blend.co2_fossil_kg_per_kg(0) - 3.14).abs() < 1e-12);
        assert_eq!(blend.co2_non_fossil_kg_per_kg(0), 0.0);
        assert!((blend.lhv_mj_per_kg(1) - 42.8).abs() < 1e-12);
    }

    #[test]
    fn test_biofuel_share_interpolation() {
        let mut shares = BiofuelShares::new();
        shares.insert("RER", 2030, 0.2);
        shares.insert("RER", 2020, 0.1);
        let s = shares.shares_for("RER", &[2025, 2050]).unwrap();
        assert!((s[0] - 0.15).abs() < 1e-12);
        assert!((s[1] - 0.2).abs() < 1e-12);
        assert!(shares.shares_for("CN", &[2025]).is_none());
    }

    fn family_strategy() -> impl Strategy<Value = FuelFamily> {
        prop::sample::select(FuelFamily::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_resolved_shares_sum_to_one(
            family in family_strategy(),
            member in 0usize..4,
            shares in prop::collection::vec(0.0f64..=1.0, 3),
            with_secondary in any::<bool>(),
        ) {
            let members = family.members();
            let primary = members[member % members.len()];
            let secondary = if with_secondary {
                members.iter().copied().find(|f| *f != primary)
            } else {
                None
            };
            let spec = FuelBlendSpec { primary, primary_share: shares, secondary };
            let years = [2020, 2030, 2040];
            let blend = FuelBlend::resolve(family, Some(&spec), &years, None).unwrap();

            prop_assert_ne!(blend.primary(), blend.secondary());
            prop_assert_eq!(blend.secondary().family(), family);
            for y in 0..years.len() {
                let [(_, a), (_, b)] = blend.components(y);
                prop_assert!((a + b - 1.0).abs() < 1e-12);
            }
        }
    }
}
