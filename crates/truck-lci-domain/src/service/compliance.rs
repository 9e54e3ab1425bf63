//! Scope filter for vehicles that cannot carry a meaningful payload

use ndarray::Array4;
use truck_lci_types::Result;

use crate::model::parameters::names;
use crate::model::VehicleParameters;

/// Vehicles carrying this much cargo or less are out of scope, in kg
pub const DEFAULT_COMPLIANCE_THRESHOLD_KG: f64 = 100.0;

/// {0, 1} mask shaped (size, powertrain, year, sample).
///
/// A vehicle is non-compliant when its total cargo mass does not exceed
/// `threshold_kg`. Non-finite cargo masses are non-compliant.
pub fn is_compliant(params: &VehicleParameters, threshold_kg: f64) -> Result<Array4<f64>> {
    let cargo = params.view(params.id(names::TOTAL_CARGO_MASS)?);
    Ok(cargo.mapv(|kg| if kg.is_finite() && kg > threshold_kg { 1.0 } else { 0.0 }))
}

/// Cargo mass in tonnes, shaped (size, powertrain, year, sample)
pub fn cargo_tonnes(params: &VehicleParameters) -> Result<Array4<f64>> {
    let cargo = params.view(params.id(names::TOTAL_CARGO_MASS)?);
    Ok(cargo.mapv(|kg| kg / 1000.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use truck_lci_types::{Powertrain, Size};

    #[test]
    fn test_threshold_is_inclusive() {
        let mut params = VehicleParameters::new(
            vec![names::TOTAL_CARGO_MASS.to_string()],
            vec![Size::T3_5, Size::T40],
            vec![Powertrain::Bev],
            vec![2020],
            2,
        );
        let small = params.cell_of(Size::T3_5, Powertrain::Bev, 2020).unwrap();
        let large = params.cell_of(Size::T40, Powertrain::Bev, 2020).unwrap();
        params.fill_cell(names::TOTAL_CARGO_MASS, small, 100.0).unwrap();
        params.fill_cell(names::TOTAL_CARGO_MASS, large, 20_000.0).unwrap();
        let id = params.id(names::TOTAL_CARGO_MASS).unwrap();
        params.set(id, small, 1, f64::NAN);

        let mask = is_compliant(&params, DEFAULT_COMPLIANCE_THRESHOLD_KG).unwrap();
        assert_eq!(mask[[0, 0, 0, 0]], 0.0);
        assert_eq!(mask[[0, 0, 0, 1]], 0.0);
        assert_eq!(mask[[1, 0, 0, 0]], 1.0);
        assert_eq!(cargo_tonnes(&params).unwrap()[[1, 0, 0, 1]], 20.0);
    }
}
