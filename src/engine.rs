//! Per-patient session pipeline.
//!
//! Each measurement session flows left to right: waveform -> representative
//! scalar -> baseline screen -> append to the monitored series -> drift
//! detector step. The screen keeps single bad sessions out of the series;
//! the drift detector watches what the screen lets through.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::algo::drift::{DriftConfig, DriftDetector, DriftState, DriftTrace, StepOutcome};
use crate::algo::outlier::{screen_candidate, ScreenVerdict, DEFAULT_ALPHA};
use crate::algo::waveform::{reduce_session, QuantizeMode, DEFAULT_REFRACTORY};
use crate::error::{MonitorError, MonitorResult};

/// Configuration for one patient's monitoring pipeline.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct MonitorConfig {
    /// Two-sided significance level for the baseline screen.
    pub screen_alpha: f64,
    /// Accepted samples required before the screen engages; earlier values
    /// seed the baseline unconditionally.
    pub min_baseline: usize,
    /// Refractory interval handed to the waveform reducer.
    pub refractory: f64,
    /// Quantization mode handed to the waveform reducer.
    pub quantize: QuantizeMode,
    /// Drift detector tuning.
    pub drift: DriftConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            screen_alpha: DEFAULT_ALPHA,
            min_baseline: 5,
            refractory: DEFAULT_REFRACTORY,
            quantize: QuantizeMode::Round,
            drift: DriftConfig::default(),
        }
    }
}

/// What happened to one session.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum SessionOutcome {
    /// The reducer found no representative value; nothing was recorded.
    NoValue,
    /// The screen rejected the value; the series is unchanged.
    Rejected(ScreenVerdict),
    /// The value joined the series and the drift detector stepped.
    Accepted { value: f64, drift: StepOutcome },
}

impl SessionOutcome {
    pub fn accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn alarmed(&self) -> bool {
        matches!(self, Self::Accepted { drift, .. } if drift.alarmed)
    }
}

/// Running counters for one monitor.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct MonitorStats {
    pub sessions_seen: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub alarms: u64,
}

/// One patient's monitor: the ever-expanding accepted series plus the
/// drift detector state riding on it.
///
/// A monitor is the unit of isolation: it owns its series and detector
/// outright, so independent patients can be driven from independent
/// threads with no shared state. Concurrent mutation of a single monitor
/// is a caller-side contract violation.
#[derive(Debug, Clone)]
pub struct PatientMonitor {
    config: MonitorConfig,
    series: Vec<f64>,
    detector: DriftDetector,
    stats: MonitorStats,
}

impl PatientMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            series: Vec::new(),
            detector: DriftDetector::new(config.drift),
            stats: MonitorStats::default(),
        }
    }

    /// Rebuild a monitor from checkpointed parts.
    pub fn restore(
        config: MonitorConfig,
        series: Vec<f64>,
        detector_state: DriftState,
        stats: MonitorStats,
    ) -> Self {
        Self {
            config,
            series,
            detector: DriftDetector::restore(config.drift, detector_state),
            stats,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// The accepted series, in arrival order.
    pub fn series(&self) -> &[f64] {
        &self.series
    }

    pub fn detector_state(&self) -> DriftState {
        self.detector.state()
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// Run one raw session waveform through the full pipeline.
    pub fn ingest_waveform(&mut self, waveform: &[(f64, f64)]) -> MonitorResult<SessionOutcome> {
        let Some(value) = reduce_session(waveform, self.config.refractory, self.config.quantize)?
        else {
            self.stats.sessions_seen += 1;
            return Ok(SessionOutcome::NoValue);
        };
        self.ingest_value(value)
    }

    /// Enter the pipeline past the reducer with an already-extracted value.
    pub fn ingest_value(&mut self, value: f64) -> MonitorResult<SessionOutcome> {
        if !value.is_finite() {
            return Err(MonitorError::NonFiniteSample { value });
        }
        self.stats.sessions_seen += 1;

        // The screen needs a baseline of at least two points regardless of
        // how low min_baseline is configured.
        if self.series.len() >= self.config.min_baseline.max(2) {
            let verdict = screen_candidate(&self.series, value, self.config.screen_alpha)?;
            if verdict.outlier {
                self.stats.rejected += 1;
                warn!(
                    value,
                    lower = verdict.lower,
                    upper = verdict.upper,
                    p_value = verdict.p_value,
                    "session value rejected by baseline screen"
                );
                return Ok(SessionOutcome::Rejected(verdict));
            }
        }

        self.series.push(value);
        self.stats.accepted += 1;
        let drift = self.detector.step(value)?;
        if drift.alarmed {
            self.stats.alarms += 1;
            info!(
                index = self.series.len() - 1,
                mu = drift.mu,
                "sustained drift alarm"
            );
        }
        Ok(SessionOutcome::Accepted { value, drift })
    }

    /// Re-run the drift detector over the full accepted series from a
    /// fresh state, materializing the per-step trajectory.
    pub fn replay_drift(&self) -> MonitorResult<DriftTrace> {
        DriftDetector::new(self.config.drift).update_batch(&self.series)
    }

    /// Discard all state: the series, the detector and the counters.
    /// Reserved for a new patient or a configuration change; the pipeline
    /// never resets itself.
    pub fn reinitialize(&mut self) {
        self.series.clear();
        self.detector.reset();
        self.stats = MonitorStats::default();
    }
}
