/// Linear-interpolation quantile over unsorted samples
///
/// Sorts a copy, then interpolates between the order statistics at
/// `floor((n-1)q)` and `ceil((n-1)q)`. A single sample is returned for any
/// `q`; an empty slice yields 0.0. `q` is clamped to `[0, 1]`.
pub fn quantile(data: &[f64], q: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

/// [`quantile`] over samples already sorted ascending
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }

    let q = if q.is_nan() { 0.0 } else { q.clamp(0.0, 1.0) };
    let pos = (n - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let upper = (pos.ceil() as usize).min(n - 1);
    let frac = pos - lower as f64;

    sorted[lower] * (1.0 - frac) + sorted[upper] * frac
}

/// Arithmetic mean; `None` for no samples
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        None
    } else {
        Some(data.iter().sum::<f64>() / data.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_to_ten() -> Vec<f64> {
        (1..=10).map(f64::from).collect()
    }

    #[test]
    fn test_median_of_even_count() {
        assert_eq!(quantile(&one_to_ten(), 0.5), 5.5);
    }

    #[test]
    fn test_p95_interpolates() {
        let p95 = quantile(&one_to_ten(), 0.95);
        assert!((p95 - 9.55).abs() < 1e-9, "p95 = {p95}");
    }

    #[test]
    fn test_unsorted_input() {
        let data = vec![10.0, 1.0, 7.0, 3.0, 5.0];
        assert_eq!(quantile(&data, 0.5), 5.0);
        assert_eq!(quantile(&data, 0.0), 1.0);
        assert_eq!(quantile(&data, 1.0), 10.0);
    }

    #[test]
    fn test_single_and_empty() {
        for q in [0.0, 0.25, 0.5, 0.95, 1.0] {
            assert_eq!(quantile(&[42.0], q), 42.0);
        }
        assert_eq!(quantile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_out_of_range_q_is_clamped() {
        let data = one_to_ten();
        assert_eq!(quantile(&data, -1.0), 1.0);
        assert_eq!(quantile(&data, 2.0), 10.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&one_to_ten()), Some(5.5));
        assert_eq!(mean(&[]), None);
    }
}
