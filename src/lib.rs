//! papr-core: trend monitoring for per-session PAPr values.
//!
//! The pipeline runs strictly left to right, one measurement session at a
//! time: a raw pressure waveform is reduced to a single representative
//! scalar, the scalar is screened against the patient's established
//! baseline, and accepted values extend the monitored series driving an
//! EWMA + two-sided CUSUM drift detector. The screen catches single bad
//! sessions; the detector catches the slow, subtle shifts no single sample
//! reveals.
//!
//! The crate has no I/O surface. Callers own ingestion, storage and
//! alerting; [`checkpoint`] turns state into bytes for whoever persists it.

pub mod algo;
pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod registry;

pub use algo::{
    detect_drift, screen_candidate, DriftConfig, DriftDetector, DriftState, DriftTrace,
    QuantizeMode, ScreenVerdict, StepOutcome,
};
pub use checkpoint::{CheckpointError, FullCheckpoint, MonitorCheckpoint, CHECKPOINT_VERSION};
pub use engine::{MonitorConfig, MonitorStats, PatientMonitor, SessionOutcome};
pub use error::{MonitorError, MonitorResult};
pub use registry::{patient_hash, MonitorRegistry, RegistryConfig, RegistryStats};
