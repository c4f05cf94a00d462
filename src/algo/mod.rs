pub mod drift;
pub mod outlier;
pub mod waveform;

// Re-exports for convenience
pub use drift::{detect_drift, DriftConfig, DriftDetector, DriftState, DriftTrace, StepOutcome};
pub use outlier::{screen_candidate, ScreenVerdict};
pub use waveform::{bin_pressures, reduce_session, representative_pressure, QuantizeMode};
