use nalgebra::{DMatrix, DVector};

use crate::error::EstimateError;

/// Least-squares polynomial fit of `y(t)` of the given degree.
///
/// Returns coefficients in ascending powers of `t`. Solved through the SVD
/// of the Vandermonde matrix; needs more points than `degree`.
pub fn polyfit(t: &[f64], y: &[f64], degree: usize) -> Result<Vec<f64>, EstimateError> {
    let n = t.len();
    if y.len() != n {
        return Err(EstimateError::FitFailed(format!(
            "{n} abscissae but {} ordinates",
            y.len()
        )));
    }
    if n <= degree {
        return Err(EstimateError::FitFailed(format!(
            "degree {degree} needs more than {degree} points, got {n}"
        )));
    }

    let a = DMatrix::<f64>::from_fn(n, degree + 1, |i, j| t[i].powi(j as i32));
    let b = DVector::<f64>::from_column_slice(y);
    let svd = a.svd(true, true);
    let coeffs = svd
        .solve(&b, 1e-12)
        .map_err(|e| EstimateError::FitFailed(e.to_string()))?;

    if coeffs.iter().any(|c| !c.is_finite()) {
        return Err(EstimateError::FitFailed(
            "non-finite polynomial coefficient".to_string(),
        ));
    }
    Ok(coeffs.iter().copied().collect())
}

/// Evaluate a polynomial with ascending coefficients at `t` (Horner).
pub fn polyval(coeffs: &[f64], t: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * t + c)
}
