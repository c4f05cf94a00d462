//! Versioned state snapshots.
//!
//! The caller owns storage; this module only turns monitor state into
//! bytes and back. Because
//! detector state is a pure function of the samples seen, a restored
//! monitor continues bit-for-bit where the snapshot left off.

use serde::{Deserialize, Serialize};

use crate::algo::drift::DriftState;
use crate::engine::{MonitorConfig, MonitorStats, PatientMonitor};
use crate::registry::MonitorRegistry;

/// Bumped on incompatible snapshot layout changes.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Snapshot of a single patient's monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorCheckpoint {
    pub patient_hash: u64,
    pub series: Vec<f64>,
    pub drift_state: DriftState,
    pub stats: MonitorStats,
}

impl MonitorCheckpoint {
    pub fn capture(patient_hash: u64, monitor: &PatientMonitor) -> Self {
        Self {
            patient_hash,
            series: monitor.series().to_vec(),
            drift_state: monitor.detector_state(),
            stats: monitor.stats(),
        }
    }

    pub fn restore(self, config: MonitorConfig) -> PatientMonitor {
        PatientMonitor::restore(config, self.series, self.drift_state, self.stats)
    }
}

/// Snapshot of a whole registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FullCheckpoint {
    pub version: u32,
    /// Capture time, milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub monitors: Vec<MonitorCheckpoint>,
}

impl FullCheckpoint {
    pub fn empty() -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            timestamp_ms: 0,
            monitors: Vec::new(),
        }
    }

    /// Capture every monitor in the registry.
    pub fn capture(registry: &MonitorRegistry) -> Self {
        let mut monitors: Vec<MonitorCheckpoint> = registry
            .iter()
            .map(|(hash, monitor)| MonitorCheckpoint::capture(hash, monitor))
            .collect();
        // HashMap iteration order is arbitrary; keep snapshots comparable.
        monitors.sort_by_key(|m| m.patient_hash);

        Self {
            version: CHECKPOINT_VERSION,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            monitors,
        }
    }

    /// Rebuild a registry from this snapshot.
    pub fn restore(self, registry: &mut MonitorRegistry) {
        let config = *registry.monitor_config();
        for ckpt in self.monitors {
            let hash = ckpt.patient_hash;
            registry.insert(hash, ckpt.restore(config));
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: FullCheckpoint = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;

        if checkpoint.version > CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: checkpoint.version,
                max_supported: CHECKPOINT_VERSION,
            });
        }

        Ok(checkpoint)
    }
}

/// Errors from snapshot encode/decode.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckpointError {
    SerializationFailed(String),
    DeserializationFailed(String),
    UnsupportedVersion { found: u32, max_supported: u32 },
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SerializationFailed(e) => write!(f, "serialization failed: {}", e),
            Self::DeserializationFailed(e) => write!(f, "deserialization failed: {}", e),
            Self::UnsupportedVersion {
                found,
                max_supported,
            } => write!(
                f,
                "unsupported checkpoint version {} (max supported {})",
                found, max_supported
            ),
        }
    }
}

impl std::error::Error for CheckpointError {}
