//! Time-axis construction, validation, and integration helpers.
//!
//! All three simulation layers share this module so that the trapezoidal AUC
//! rule and the strict-monotonicity contract are defined exactly once.

use crate::error::EngineError;

/// Build an inclusive time axis `start, start+step, ... >= stop`.
///
/// Mirrors `arange(start, stop + step, step)`: the final point lands at or
/// after `stop`, so a 168 h horizon with a 6 h step ends exactly at 168.0.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let step = step.max(1e-6);
    let mut points = Vec::new();
    let mut idx = 0u64;
    loop {
        let t = start + idx as f64 * step;
        points.push(t);
        if t >= stop {
            break;
        }
        idx += 1;
    }
    points
}

/// Validate a simulation time axis: non-empty and strictly increasing.
pub fn validate_timepoints(time: &[f64]) -> Result<(), EngineError> {
    if time.is_empty() {
        return Err(EngineError::EmptyTimepoints);
    }
    for pair in time.windows(2) {
        if pair[1] <= pair[0] {
            return Err(EngineError::NonMonotonicTimepoints);
        }
    }
    Ok(())
}

/// Area under the curve via the trapezoidal rule.
///
/// Ties between integration strategies are always broken in favour of the
/// trapezoid so that summaries reproduce bit-for-bit across runs.
pub fn trapezoid(values: &[f64], time: &[f64]) -> f64 {
    let n = values.len().min(time.len());
    if n < 2 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 1..n {
        let dt = time[i] - time[i - 1];
        area += 0.5 * (values[i] + values[i - 1]) * dt;
    }
    area
}

/// Clamp into [0, 1].
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Clamp into an arbitrary closed range.
pub fn clamp_range(value: f64, lo: f64, hi: f64) -> f64 {
    value.clamp(lo, hi)
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arange_hits_horizon() {
        let axis = arange(0.0, 168.0, 6.0);
        assert_eq!(axis[0], 0.0);
        assert_eq!(*axis.last().unwrap(), 168.0);
        assert_eq!(axis.len(), 29);
    }

    #[test]
    fn test_arange_overshoots_when_step_does_not_divide() {
        let axis = arange(0.0, 24.0, 7.0);
        assert!(*axis.last().unwrap() >= 24.0);
        assert!(axis.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert_eq!(validate_timepoints(&[]), Err(EngineError::EmptyTimepoints));
    }

    #[test]
    fn test_validate_rejects_non_increasing() {
        assert_eq!(
            validate_timepoints(&[0.0, 1.0, 1.0]),
            Err(EngineError::NonMonotonicTimepoints)
        );
        assert_eq!(
            validate_timepoints(&[0.0, 2.0, 1.0]),
            Err(EngineError::NonMonotonicTimepoints)
        );
    }

    #[test]
    fn test_validate_accepts_single_point() {
        assert!(validate_timepoints(&[0.0]).is_ok());
    }

    #[test]
    fn test_trapezoid_constant() {
        let time = [0.0, 1.0, 2.0, 3.0];
        let values = [2.0, 2.0, 2.0, 2.0];
        assert!((trapezoid(&values, &time) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_trapezoid_linear_ramp() {
        let time = [0.0, 1.0, 2.0];
        let values = [0.0, 1.0, 2.0];
        assert!((trapezoid(&values, &time) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_trapezoid_short_series_is_zero() {
        assert_eq!(trapezoid(&[1.0], &[0.0]), 0.0);
        assert_eq!(trapezoid(&[], &[]), 0.0);
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < 1e-12);
    }
}
