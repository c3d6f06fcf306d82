//! Descriptive statistics for the monthly price aggregations. All
//! functions return `None` rather than NaN when the input is too small,
//! so CSV output can carry a null field instead of a coerced zero.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n-1 estimator, matching pandas/NumPy
/// defaults). Undefined for fewer than two observations.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation divided by mean, the unit-free dispersion
/// measure the price dataset reports as "volatility". Undefined for a
/// single observation or a zero mean.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m == 0.0 {
        return None;
    }
    Some(sample_std(values)? / m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn test_mean_and_median() {
        assert_eq!(mean(&[]), None);
        assert!(close(mean(&[30.0, 32.0]).unwrap(), 31.0));
        assert!(close(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0));
        assert!(close(median(&[4.0, 1.0, 2.0, 3.0]).unwrap(), 2.5));
    }

    #[test]
    fn test_sample_std_uses_n_minus_one() {
        // std([30, 32]) with ddof=1 is sqrt(2)
        assert!(close(sample_std(&[30.0, 32.0]).unwrap(), 2.0_f64.sqrt()));
        assert_eq!(sample_std(&[30.0]), None);
        assert_eq!(sample_std(&[]), None);
    }

    #[test]
    fn test_coefficient_of_variation() {
        let cv = coefficient_of_variation(&[30.0, 32.0]).unwrap();
        assert!(close(cv, 2.0_f64.sqrt() / 31.0));
        // single observation stays undefined, never zero
        assert_eq!(coefficient_of_variation(&[30.0]), None);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), None);
    }
}
