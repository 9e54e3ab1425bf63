//! Year interpolation for tables defined at reference years

/// Behaviour outside the reference year range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extrapolation {
    /// Hold the first/last value
    Clamp,
    /// Extend the first/last segment
    Linear,
}

/// Locate `year` among ascending `reference_years`.
///
/// Returns the two bracketing positions and the weight of the upper one,
/// so that `value = (1 - w) * v[lo] + w * v[hi]`.
pub fn bracket(reference_years: &[u16], year: u16, mode: Extrapolation) -> (usize, usize, f64) {
    let n = reference_years.len();
    if n == 0 {
        return (0, 0, 0.0);
    }
    if n == 1 {
        return (0, 0, 0.0);
    }
    let y = f64::from(year);
    let (lo, hi) = match reference_years.iter().position(|&r| r >= year) {
        Some(0) => (0, 1),
        Some(i) => (i - 1, i),
        None => (n - 2, n - 1),
    };
    let y0 = f64::from(reference_years[lo]);
    let y1 = f64::from(reference_years[hi]);
    let mut w = (y - y0) / (y1 - y0);
    if mode == Extrapolation::Clamp {
        w = w.clamp(0.0, 1.0);
    }
    (lo, hi, w)
}

/// Interpolate a scalar series
pub fn interpolate(reference_years: &[u16], values: &[f64], year: u16, mode: Extrapolation) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let (lo, hi, w) = bracket(reference_years, year, mode);
    (1.0 - w) * values[lo] + w * values[hi]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_range() {
        let v = interpolate(&[2020, 2030], &[1.0, 3.0], 2025, Extrapolation::Clamp);
        assert!((v - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_exact_reference_year() {
        let v = interpolate(&[2020, 2030, 2040], &[1.0, 3.0, 7.0], 2030, Extrapolation::Linear);
        assert!((v - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_outside_range() {
        let years = [2020, 2030];
        let values = [1.0, 3.0];
        assert!((interpolate(&years, &values, 2040, Extrapolation::Clamp) - 3.0).abs() < 1e-12);
        assert!((interpolate(&years, &values, 2040, Extrapolation::Linear) - 5.0).abs() < 1e-12);
        assert!((interpolate(&years, &values, 2010, Extrapolation::Linear) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_reference_year() {
        assert_eq!(interpolate(&[2020], &[4.0], 2050, Extrapolation::Linear), 4.0);
    }
}
