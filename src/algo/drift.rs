//! Subtle-drift detection on the accepted PAPr series.
//!
//! An exponentially-weighted baseline tracks very slow background change
//! while an EWMA variance estimate standardizes each residual; the
//! standardized residuals feed a two-sided CUSUM that accumulates evidence
//! of a sustained shift in either direction. Single spikes are bounded by
//! winsorization, so only persistent deviation climbs the accumulators.
//!
//! The state tuple `(mu, var, s_plus, s_minus)` is a pure function of the
//! samples seen so far and the configuration: replaying the same sequence
//! reproduces the same trajectory and the same alarms.

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// Floor applied to the variance estimate before standardization.
pub const VAR_FLOOR: f64 = 1e-12;

/// Variance seed used when the first sample initializes the state.
const INITIAL_VARIANCE: f64 = 1e-6;

/// Guard added to the standardization denominator for the degenerate
/// first step.
const Z_GUARD: f64 = 1e-12;

/// Tuning for the drift detector.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DriftConfig {
    /// EWMA decay for the baseline; smaller tracks slower, catching more
    /// persistent drift at the cost of reactivity.
    pub alpha_baseline: f64,
    /// EWMA decay for the residual variance estimate.
    pub alpha_var: f64,
    /// Target shift size in standardized units; the CUSUM reference value
    /// is `delta / 2`.
    pub delta: f64,
    /// Decision threshold on either accumulator; larger means fewer false
    /// alarms and slower detection.
    pub h: f64,
    /// Samples during which alarms are suppressed while state accumulates.
    pub warmup: usize,
    /// Winsorization bound on the standardized residual; `None` disables
    /// clipping.
    pub clip_z: Option<f64>,
    /// When true, an alarm re-seeds the baseline from the alarming sample
    /// and resets the variance estimate.
    pub recenter_on_alarm: bool,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            alpha_baseline: 0.01,
            alpha_var: 0.05,
            delta: 0.25,
            h: 5.0,
            warmup: 100,
            clip_z: Some(6.0),
            recenter_on_alarm: false,
        }
    }
}

impl DriftConfig {
    /// Config tuned for a given shift size and threshold, defaults elsewhere.
    pub fn with_shift(delta: f64, h: f64) -> Self {
        Self {
            delta,
            h,
            ..Self::default()
        }
    }

    /// CUSUM reference value `k = delta / 2`.
    pub fn reference_k(&self) -> f64 {
        self.delta / 2.0
    }
}

/// The running state tuple. Obtain via [`DriftDetector::state`] for
/// checkpointing and feed back through [`DriftDetector::restore`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DriftState {
    mu: f64,
    var: f64,
    s_plus: f64,
    s_minus: f64,
    samples_seen: u64,
}

impl DriftState {
    fn empty() -> Self {
        Self {
            mu: 0.0,
            var: 0.0,
            s_plus: 0.0,
            s_minus: 0.0,
            samples_seen: 0,
        }
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn s_plus(&self) -> f64 {
        self.s_plus
    }

    pub fn s_minus(&self) -> f64 {
        self.s_minus
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    /// Standard deviation as used for standardization (floored).
    pub fn sigma(&self) -> f64 {
        self.var.max(VAR_FLOOR).sqrt()
    }
}

/// Recorded values for one processed sample. For an alarmed step the
/// accumulators show the post-reset zeros, not the pre-alarm peak.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    pub alarmed: bool,
    pub mu: f64,
    pub sigma: f64,
    pub s_plus: f64,
    pub s_minus: f64,
}

/// Full per-step trajectory from batch processing: four series parallel to
/// the input plus zero-based alarm indices into it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DriftTrace {
    pub alarms: Vec<usize>,
    pub mu: Vec<f64>,
    pub sigma: Vec<f64>,
    pub s_plus: Vec<f64>,
    pub s_minus: Vec<f64>,
}

impl DriftTrace {
    pub fn len(&self) -> usize {
        self.mu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mu.is_empty()
    }

    pub fn detected(&self) -> bool {
        !self.alarms.is_empty()
    }

    pub fn first_alarm(&self) -> Option<usize> {
        self.alarms.first().copied()
    }
}

/// Online drift detector over one monitored series.
///
/// Strictly sequential: each update depends on the previous state, so one
/// detector serves exactly one series. Independent series get independent
/// detectors and may run on any threads the caller likes.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DriftDetector {
    config: DriftConfig,
    state: DriftState,
}

impl DriftDetector {
    pub fn new(config: DriftConfig) -> Self {
        Self {
            config,
            state: DriftState::empty(),
        }
    }

    /// Rebuild a detector from a checkpointed state tuple.
    pub fn restore(config: DriftConfig, state: DriftState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub fn state(&self) -> DriftState {
        self.state
    }

    /// Discard all accumulated state. Only explicit reinitialization ever
    /// clears a detector; alarms re-arm the accumulators but keep the
    /// baseline evolving.
    pub fn reset(&mut self) {
        self.state = DriftState::empty();
    }

    /// Process one sample and report the recorded step values.
    ///
    /// Update order: baseline, residual against the post-update baseline,
    /// variance (floored at use), standardize, winsorize, accumulate from
    /// the previous accumulator values, then threshold-and-reset gated on
    /// the warmup index.
    pub fn step(&mut self, x: f64) -> MonitorResult<StepOutcome> {
        if !x.is_finite() {
            return Err(MonitorError::NonFiniteSample { value: x });
        }

        let cfg = self.config;
        let st = &mut self.state;

        if st.samples_seen == 0 {
            st.mu = x;
            st.var = INITIAL_VARIANCE;
        }
        let index = st.samples_seen as usize;

        st.mu = (1.0 - cfg.alpha_baseline) * st.mu + cfg.alpha_baseline * x;
        let r = x - st.mu;
        st.var = (1.0 - cfg.alpha_var) * st.var + cfg.alpha_var * (r * r);
        let sigma = st.var.max(VAR_FLOOR).sqrt();

        let mut z = r / (sigma + Z_GUARD);
        if let Some(bound) = cfg.clip_z {
            z = z.clamp(-bound, bound);
        }

        let k = cfg.reference_k();
        st.s_plus = (st.s_plus + z - k).max(0.0);
        st.s_minus = (st.s_minus - z - k).max(0.0);

        let mut alarmed = false;
        if index >= cfg.warmup && (st.s_plus > cfg.h || st.s_minus > cfg.h) {
            alarmed = true;
            st.s_plus = 0.0;
            st.s_minus = 0.0;
            if cfg.recenter_on_alarm {
                st.mu = x;
                st.var = INITIAL_VARIANCE;
            }
        }

        st.samples_seen += 1;

        Ok(StepOutcome {
            alarmed,
            mu: st.mu,
            sigma,
            s_plus: st.s_plus,
            s_minus: st.s_minus,
        })
    }

    /// Process a batch of samples, continuing from the current state, and
    /// materialize the full trajectory. Alarm indices are zero-based into
    /// `xs`.
    pub fn update_batch(&mut self, xs: &[f64]) -> MonitorResult<DriftTrace> {
        let mut trace = DriftTrace {
            alarms: Vec::new(),
            mu: Vec::with_capacity(xs.len()),
            sigma: Vec::with_capacity(xs.len()),
            s_plus: Vec::with_capacity(xs.len()),
            s_minus: Vec::with_capacity(xs.len()),
        };

        for (i, &x) in xs.iter().enumerate() {
            let out = self.step(x)?;
            if out.alarmed {
                trace.alarms.push(i);
            }
            trace.mu.push(out.mu);
            trace.sigma.push(out.sigma);
            trace.s_plus.push(out.s_plus);
            trace.s_minus.push(out.s_minus);
        }

        Ok(trace)
    }
}

/// One-shot batch form: run a fresh detector over a full historical series.
pub fn detect_drift(xs: &[f64], config: &DriftConfig) -> MonitorResult<DriftTrace> {
    DriftDetector::new(*config).update_batch(xs)
}
