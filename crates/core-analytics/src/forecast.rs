//! Time-series forecasting: least-squares linear trend and exponential
//! smoothing, each with a residual-based confidence interval.

use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecast {
    pub value: f32,
    /// 0–1; shrinks as residual spread grows relative to the data scale.
    pub confidence: f32,
    pub lower_bound: f32,
    pub upper_bound: f32,
}

impl Forecast {
    fn flat(value: f32) -> Self {
        Self {
            value,
            confidence: 0.0,
            lower_bound: value,
            upper_bound: value,
        }
    }
}

fn confidence_from(residual_sigma: f32, scale: f32) -> f32 {
    if scale <= f32::EPSILON {
        return if residual_sigma <= f32::EPSILON { 1.0 } else { 0.0 };
    }
    (1.0 - residual_sigma / scale).clamp(0.0, 1.0)
}

/// Least-squares line through the series, extrapolated `steps_ahead`
/// samples past the end. The interval is ±2σ of the fit residuals.
pub fn linear(data: &[f32], steps_ahead: usize) -> Forecast {
    let n = data.len();
    if n == 0 {
        return Forecast::flat(0.0);
    }
    if n == 1 {
        return Forecast::flat(data[0]);
    }

    let xs_mean = (n as f32 - 1.0) / 2.0;
    let ys_mean = stats::mean(data);
    let mut num = 0.0f32;
    let mut den = 0.0f32;
    for (i, &y) in data.iter().enumerate() {
        let dx = i as f32 - xs_mean;
        num += dx * (y - ys_mean);
        den += dx * dx;
    }
    let slope = if den > 0.0 { num / den } else { 0.0 };
    let intercept = ys_mean - slope * xs_mean;

    let residual_sigma = {
        let residuals: Vec<f32> = data
            .iter()
            .enumerate()
            .map(|(i, &y)| y - (intercept + slope * i as f32))
            .collect();
        stats::stddev(&residuals)
    };

    let target = (n - 1 + steps_ahead) as f32;
    let value = intercept + slope * target;
    let spread = 2.0 * residual_sigma;
    Forecast {
        value,
        confidence: confidence_from(residual_sigma, stats::stddev(data).max(value.abs())),
        lower_bound: value - spread,
        upper_bound: value + spread,
    }
}

/// Exponential smoothing with factor `alpha` in (0, 1]; higher alpha
/// tracks recent samples more closely. Forecast is the final smoothed
/// level; the interval is ±2σ of the one-step prediction errors.
pub fn exponential(data: &[f32], alpha: f32) -> Forecast {
    if data.is_empty() {
        return Forecast::flat(0.0);
    }
    let alpha = alpha.clamp(1e-3, 1.0);
    let mut level = data[0];
    let mut errors = Vec::with_capacity(data.len());
    for &sample in &data[1..] {
        errors.push(sample - level);
        level = alpha * sample + (1.0 - alpha) * level;
    }
    let sigma = stats::stddev(&errors);
    let spread = 2.0 * sigma;
    Forecast {
        value: level,
        confidence: confidence_from(sigma, stats::stddev(data).max(level.abs())),
        lower_bound: level - spread,
        upper_bound: level + spread,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_singleton_series_are_flat() {
        assert_eq!(linear(&[], 3).value, 0.0);
        let f = linear(&[7.0], 5);
        assert_eq!(f.value, 7.0);
        assert_eq!(exponential(&[], 0.5).value, 0.0);
    }

    #[test]
    fn linear_extrapolates_a_perfect_trend() {
        let data: Vec<f32> = (0..10).map(|i| 3.0 + 2.0 * i as f32).collect();
        let f = linear(&data, 1);
        assert!((f.value - 23.0).abs() < 1e-3);
        // Perfect fit: tight interval and high confidence.
        assert!(f.upper_bound - f.lower_bound < 1e-3);
        assert!(f.confidence > 0.9);
    }

    #[test]
    fn linear_steps_ahead_scales_with_slope() {
        let data: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let one = linear(&data, 1);
        let five = linear(&data, 5);
        assert!((five.value - one.value - 4.0).abs() < 1e-3);
    }

    #[test]
    fn exponential_tracks_a_level_shift() {
        let mut data = vec![10.0; 20];
        data.extend(vec![20.0; 20]);
        let f = exponential(&data, 0.5);
        assert!((f.value - 20.0).abs() < 0.1);
        assert!(f.lower_bound <= f.value && f.value <= f.upper_bound);
    }

    #[test]
    fn noisy_series_lowers_confidence() {
        let steady: Vec<f32> = (0..40).map(|i| i as f32).collect();
        let noisy: Vec<f32> = (0..40)
            .map(|i| i as f32 + if i % 2 == 0 { 15.0 } else { -15.0 })
            .collect();
        assert!(linear(&steady, 1).confidence > linear(&noisy, 1).confidence);
    }
}
