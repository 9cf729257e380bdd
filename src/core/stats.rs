//! Window statistics.

/// Population standard deviation of a slice of values.
///
/// Divides by `N`, not `N - 1`. An empty slice has no spread and yields 0.0.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
