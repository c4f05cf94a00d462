//! Single-sample outlier screen against a fixed personal baseline.
//!
//! A new session value is checked against a two-sided prediction interval
//! built from the baseline mean and unbiased sample standard deviation with
//! a Student's-t critical value. Values falling outside the interval are
//! rejected before they ever reach the monitored series.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{MonitorError, MonitorResult};

/// Default two-sided significance level.
pub const DEFAULT_ALPHA: f64 = 0.01;

/// Screening decision for one candidate value.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ScreenVerdict {
    /// Lower bound of the prediction interval.
    pub lower: f64,
    /// Upper bound of the prediction interval.
    pub upper: f64,
    /// Two-sided p-value of the candidate under the baseline.
    pub p_value: f64,
    /// True when the candidate falls outside `[lower, upper]`.
    pub outlier: bool,
}

/// Test whether `candidate` is consistent with `baseline` at level `alpha`.
///
/// The interval is `mean ± t(1 - alpha/2, n-1) * s * sqrt(1 + 1/n)`, the
/// prediction interval for one future observation, not the narrower
/// confidence interval for the mean. A baseline with zero spread collapses
/// to the point interval `[mean, mean]`, so any differing candidate is an
/// outlier with p-value 0.
pub fn screen_candidate(
    baseline: &[f64],
    candidate: f64,
    alpha: f64,
) -> MonitorResult<ScreenVerdict> {
    let n = baseline.len();
    if n < 2 {
        return Err(MonitorError::InsufficientBaseline { required: 2, got: n });
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(MonitorError::InvalidSignificance(alpha));
    }
    if !candidate.is_finite() {
        return Err(MonitorError::NonFiniteSample { value: candidate });
    }
    if let Some(&bad) = baseline.iter().find(|v| !v.is_finite()) {
        return Err(MonitorError::NonFiniteSample { value: bad });
    }

    let nf = n as f64;
    let mean = baseline.iter().sum::<f64>() / nf;
    let ss: f64 = baseline.iter().map(|x| (x - mean) * (x - mean)).sum();
    let sd = (ss / (nf - 1.0)).sqrt();
    let se_pred = sd * (1.0 + 1.0 / nf).sqrt();

    if se_pred <= 0.0 {
        let outlier = candidate != mean;
        return Ok(ScreenVerdict {
            lower: mean,
            upper: mean,
            p_value: if outlier { 0.0 } else { 1.0 },
            outlier,
        });
    }

    // n >= 2 guarantees a valid degrees-of-freedom parameter.
    let dist = StudentsT::new(0.0, 1.0, nf - 1.0).expect("dof >= 1");
    let t_crit = dist.inverse_cdf(1.0 - alpha / 2.0);
    let t_stat = (candidate - mean) / se_pred;
    let p_value = 2.0 * (1.0 - dist.cdf(t_stat.abs()));

    let lower = mean - t_crit * se_pred;
    let upper = mean + t_crit * se_pred;

    Ok(ScreenVerdict {
        lower,
        upper,
        p_value,
        outlier: candidate < lower || candidate > upper,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_baseline_flags_far_candidate() {
        let verdict = screen_candidate(&[10.0, 10.0, 10.0, 10.0], 50.0, 0.01).unwrap();
        assert!(verdict.outlier);
        assert_eq!(verdict.lower, 10.0);
        assert_eq!(verdict.upper, 10.0);
        assert_eq!(verdict.p_value, 0.0);
    }

    #[test]
    fn test_flat_baseline_accepts_exact_match() {
        let verdict = screen_candidate(&[10.0, 10.0, 10.0], 10.0, 0.01).unwrap();
        assert!(!verdict.outlier);
        assert_eq!(verdict.p_value, 1.0);
    }

    #[test]
    fn test_candidate_near_mean_accepted() {
        let baseline = [9.8, 10.1, 10.0, 9.9, 10.2, 10.0];
        let verdict = screen_candidate(&baseline, 10.05, 0.01).unwrap();
        assert!(!verdict.outlier);
        assert!(verdict.p_value > 0.01);
        assert!(verdict.lower < 10.05 && 10.05 < verdict.upper);
    }

    #[test]
    fn test_far_candidate_rejected_with_small_p() {
        let baseline = [9.8, 10.1, 10.0, 9.9, 10.2, 10.0];
        let verdict = screen_candidate(&baseline, 14.0, 0.01).unwrap();
        assert!(verdict.outlier);
        assert!(verdict.p_value < 0.01);
    }

    #[test]
    fn test_interval_symmetric_about_mean() {
        let baseline = [4.0, 5.0, 6.0, 5.0];
        let verdict = screen_candidate(&baseline, 5.0, 0.05).unwrap();
        let mean = 5.0;
        assert!(
            ((mean - verdict.lower) - (verdict.upper - mean)).abs() < 1e-9,
            "interval must be symmetric around the baseline mean"
        );
    }

    #[test]
    fn test_tighter_alpha_widens_interval() {
        let baseline = [9.5, 10.5, 10.0, 9.8, 10.2];
        let strict = screen_candidate(&baseline, 10.0, 0.01).unwrap();
        let loose = screen_candidate(&baseline, 10.0, 0.10).unwrap();
        assert!(strict.upper > loose.upper);
        assert!(strict.lower < loose.lower);
    }

    #[test]
    fn test_short_baseline_is_an_error() {
        let err = screen_candidate(&[10.0], 10.0, 0.01).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::InsufficientBaseline { required: 2, got: 1 }
        ));
        assert!(screen_candidate(&[], 10.0, 0.01).is_err());
    }

    #[test]
    fn test_bad_significance_is_an_error() {
        let baseline = [10.0, 11.0];
        assert!(screen_candidate(&baseline, 10.0, 0.0).is_err());
        assert!(screen_candidate(&baseline, 10.0, 1.0).is_err());
        assert!(screen_candidate(&baseline, 10.0, -0.5).is_err());
    }

    #[test]
    fn test_non_finite_values_fail_fast() {
        assert!(screen_candidate(&[10.0, 11.0], f64::NAN, 0.01).is_err());
        assert!(screen_candidate(&[10.0, f64::INFINITY], 10.0, 0.01).is_err());
    }
}
