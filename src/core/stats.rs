//! Order statistics over Monte Carlo samples.

use super::error::SimulationError;

/// Linearly interpolated quantile, `q` in `[0, 1]`.
///
/// Sorts a copy of `values` ascending and interpolates between the ranks at
/// `floor(q * (n - 1))` and `ceil(q * (n - 1))`.
pub fn quantile(values: &[f64], q: f64) -> Result<f64, SimulationError> {
    let mut sorted = values.to_vec();
    quantile_in_place(&mut sorted, q)
}

pub fn median(values: &[f64]) -> Result<f64, SimulationError> {
    quantile(values, 0.5)
}

/// Same as [`quantile`] but sorts `values` in place instead of copying.
pub fn quantile_in_place(values: &mut [f64], q: f64) -> Result<f64, SimulationError> {
    if values.is_empty() {
        return Err(SimulationError::EmptySample);
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    if n == 1 {
        return Ok(values[0]);
    }

    let rank = q.clamp(0.0, 1.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        Ok(values[lower])
    } else {
        let w = rank - lower as f64;
        Ok(values[lower] * (1.0 - w) + values[upper] * w)
    }
}
