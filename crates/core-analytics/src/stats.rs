//! Basic descriptive statistics shared by the analytics routines.

pub fn mean(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f32>() / data.len() as f32
}

/// Sample standard deviation (Bessel-corrected, `n - 1` divisor).
pub fn stddev(data: &[f32]) -> f32 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let var = data.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / (data.len() - 1) as f32;
    var.sqrt()
}

pub fn median(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Mean of the trailing `window` samples (the whole series if shorter).
pub fn moving_average(data: &[f32], window: usize) -> f32 {
    if data.is_empty() || window == 0 {
        return 0.0;
    }
    let start = data.len().saturating_sub(window);
    mean(&data[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_yield_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(stddev(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(moving_average(&[], 5), 0.0);
    }

    #[test]
    fn mean_and_stddev_of_known_series() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&data), 5.0);
        // Squared deviations sum to 32 over n - 1 = 7 samples.
        assert!((stddev(&data) - (32.0f32 / 7.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn moving_average_uses_trailing_window() {
        let data = [1.0, 1.0, 1.0, 10.0, 10.0];
        assert_eq!(moving_average(&data, 2), 10.0);
        assert!((moving_average(&data, 100) - 4.6).abs() < 1e-6);
    }
}
