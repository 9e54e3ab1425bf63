//! Impact characterization matrix and result-category split rules

use ndarray::{s, Array1, Array2, Array3, ArrayView1};
use serde::{Deserialize, Serialize};
use truck_lci_types::{Error, ResultCategory, Result};

use super::activity::Selector;
use super::interpolation::{bracket, Extrapolation};

/// How the impact matrix is placed in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearMode {
    /// Interpolate between reference years, extrapolating linearly outside
    #[default]
    Interpolated,
    /// Always use the first reference year
    Static,
}

/// Characterization factors, shaped (reference years, categories, activities)
#[derive(Debug, Clone)]
pub struct ImpactMatrix {
    method: String,
    reference_years: Vec<u16>,
    categories: Vec<String>,
    values: Array3<f64>,
}

impl ImpactMatrix {
    pub fn new(
        method: &str,
        reference_years: Vec<u16>,
        categories: Vec<String>,
        values: Array3<f64>,
    ) -> Result<Self> {
        let (years, cats, _) = values.dim();
        if reference_years.is_empty() {
            return Err(Error::ReferenceData(format!(
                "impact method '{}' has no reference year",
                method
            )));
        }
        if years != reference_years.len() || cats != categories.len() {
            return Err(Error::DimensionMismatch(format!(
                "impact matrix {:?} for {} years and {} categories",
                values.dim(),
                reference_years.len(),
                categories.len()
            )));
        }
        if reference_years.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::ReferenceData(
                "impact reference years must be strictly ascending".to_string(),
            ));
        }
        Ok(Self {
            method: method.to_string(),
            reference_years,
            categories,
            values,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn reference_years(&self) -> &[u16] {
        &self.reference_years
    }

    /// Number of activities characterized
    pub fn width(&self) -> usize {
        self.values.dim().2
    }

    /// Factors for one calculation year, zero-padded to `dimension` activities
    pub fn at_year(&self, year: u16, mode: YearMode, dimension: usize) -> Result<Array2<f64>> {
        let width = self.width();
        if width > dimension {
            return Err(Error::DimensionMismatch(format!(
                "impact matrix covers {} activities, technology matrix has {}",
                width, dimension
            )));
        }
        let (lo, hi, w) = match mode {
            YearMode::Static => (0, 0, 0.0),
            YearMode::Interpolated => bracket(&self.reference_years, year, Extrapolation::Linear),
        };
        let mut out = Array2::zeros((self.categories.len(), dimension));
        let lower = self.values.slice(s![lo, .., ..]);
        let upper = self.values.slice(s![hi, .., ..]);
        out.slice_mut(s![.., ..width])
            .assign(&(&lower * (1.0 - w) + &upper * w));
        Ok(out)
    }
}

/// `B(year) · x` for one impact matrix slice
pub fn project(factors: &Array2<f64>, x: ArrayView1<'_, f64>) -> Array1<f64> {
    factors.dot(&x)
}

/// Reference-data rule assigning activities to a result category
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRule {
    pub category: ResultCategory,
    pub name_contains: String,
    pub location_contains: Option<String>,
}

impl SplitRule {
    pub fn selector(&self) -> Selector {
        let selector = Selector::all([self.name_contains.as_str()]);
        match &self.location_contains {
            Some(loc) => selector.in_location(loc),
            None => selector,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn matrix() -> ImpactMatrix {
        // two years, one category, two activities
        let values = array![[[1.0, 2.0]], [[3.0, 6.0]]];
        ImpactMatrix::new("test", vec![2020, 2040], vec!["climate change".to_string()], values)
            .unwrap()
    }

    #[test]
    fn test_interpolated_and_padded() {
        let b = matrix().at_year(2030, YearMode::Interpolated, 3).unwrap();
        assert_eq!(b.dim(), (1, 3));
        assert!((b[[0, 0]] - 2.0).abs() < 1e-12);
        assert!((b[[0, 1]] - 4.0).abs() < 1e-12);
        assert_eq!(b[[0, 2]], 0.0);
    }

    #[test]
    fn test_linear_extrapolation_and_static_mode() {
        let b = matrix().at_year(2050, YearMode::Interpolated, 2).unwrap();
        assert!((b[[0, 0]] - 4.0).abs() < 1e-12);
        let b = matrix().at_year(2050, YearMode::Static, 2).unwrap();
        assert_eq!(b[[0, 1]], 2.0);
    }

    #[test]
    fn test_wider_than_matrix_rejected() {
        assert!(matches!(
            matrix().at_year(2030, YearMode::Static, 1),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_projection() {
        let b = matrix().at_year(2020, YearMode::Static, 2).unwrap();
        let x = array![2.0, 0.5];
        assert_eq!(project(&b, x.view()), array![3.0]);
    }
}
