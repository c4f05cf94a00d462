//! Bounded multi-patient monitor registry.
//!
//! One [`PatientMonitor`] per patient, keyed by the xxh3 hash of the
//! patient identifier, with LRU-style eviction so a long-running deployment
//! never grows without bound. Each monitor is its own isolation unit; the
//! registry adds bookkeeping, not locking.

use std::collections::HashMap;
use std::time::Instant;

use xxhash_rust::xxh3::xxh3_64;

use crate::engine::{MonitorConfig, PatientMonitor};

/// Stable hash for a patient identifier.
pub fn patient_hash(patient_id: &str) -> u64 {
    xxh3_64(patient_id.as_bytes())
}

/// Bounds and eviction tuning.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    /// Maximum number of monitors to keep resident.
    pub max_patients: usize,
    /// Monitors with fewer sessions than this are shielded from eviction
    /// (still establishing a baseline); when every entry is shielded the
    /// longest-idle one goes anyway. Zero disables the shield.
    pub min_sessions_for_eviction: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_patients: 10_000,
            min_sessions_for_eviction: 0,
        }
    }
}

#[derive(Debug)]
struct MonitorEntry {
    monitor: PatientMonitor,
    last_access: Instant,
}

impl MonitorEntry {
    fn new(monitor: PatientMonitor) -> Self {
        Self {
            monitor,
            last_access: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    /// Lower score = better eviction candidate. Established, recently
    /// active monitors score high.
    fn retention_score(&self) -> f64 {
        let idle_secs = self.last_access.elapsed().as_secs_f64();
        let session_factor = (self.monitor.stats().sessions_seen as f64).ln_1p().max(1.0);
        session_factor / (idle_secs + 1.0)
    }
}

/// Registry counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryStats {
    pub total_patients: usize,
    pub total_creations: u64,
    pub total_accesses: u64,
    pub total_evictions: u64,
    pub capacity: usize,
}

/// Memory-bounded store of per-patient monitors.
pub struct MonitorRegistry {
    monitors: HashMap<u64, MonitorEntry>,
    config: RegistryConfig,
    monitor_config: MonitorConfig,
    stats: RegistryStats,
}

impl MonitorRegistry {
    pub fn new(monitor_config: MonitorConfig) -> Self {
        Self::with_config(monitor_config, RegistryConfig::default())
    }

    pub fn with_config(monitor_config: MonitorConfig, config: RegistryConfig) -> Self {
        Self {
            monitors: HashMap::with_capacity(config.max_patients.min(1024)),
            stats: RegistryStats {
                capacity: config.max_patients,
                ..RegistryStats::default()
            },
            config,
            monitor_config,
        }
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.monitors.len() >= self.config.max_patients
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_patients: self.monitors.len(),
            ..self.stats
        }
    }

    pub fn monitor_config(&self) -> &MonitorConfig {
        &self.monitor_config
    }

    pub fn contains(&self, patient_id: &str) -> bool {
        self.monitors.contains_key(&patient_hash(patient_id))
    }

    /// Fetch a patient's monitor, updating its recency.
    pub fn get_mut(&mut self, patient_id: &str) -> Option<&mut PatientMonitor> {
        self.get_mut_by_hash(patient_hash(patient_id))
    }

    pub fn get_mut_by_hash(&mut self, hash: u64) -> Option<&mut PatientMonitor> {
        let entry = self.monitors.get_mut(&hash)?;
        entry.touch();
        self.stats.total_accesses += 1;
        Some(&mut entry.monitor)
    }

    /// Fetch or create the monitor for a patient, evicting one entry first
    /// when at capacity.
    pub fn get_or_create(&mut self, patient_id: &str) -> &mut PatientMonitor {
        let hash = patient_hash(patient_id);
        if !self.monitors.contains_key(&hash) {
            if self.is_full() {
                self.evict_one();
            }
            let monitor = PatientMonitor::new(self.monitor_config);
            self.monitors.insert(hash, MonitorEntry::new(monitor));
            self.stats.total_creations += 1;
            tracing::debug!(hash, "created monitor");
        }
        let entry = self
            .monitors
            .get_mut(&hash)
            .expect("entry inserted or present above");
        entry.touch();
        self.stats.total_accesses += 1;
        &mut entry.monitor
    }

    /// Insert a prebuilt monitor (checkpoint restore path). Returns the
    /// evicted monitor's hash when insertion pushed something out.
    pub fn insert(&mut self, hash: u64, monitor: PatientMonitor) -> Option<u64> {
        let mut evicted = None;
        if self.is_full() && !self.monitors.contains_key(&hash) {
            evicted = self.evict_one();
        }
        self.monitors.insert(hash, MonitorEntry::new(monitor));
        self.stats.total_creations += 1;
        evicted
    }

    pub fn remove(&mut self, patient_id: &str) -> Option<PatientMonitor> {
        self.monitors
            .remove(&patient_hash(patient_id))
            .map(|e| e.monitor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &PatientMonitor)> {
        self.monitors.iter().map(|(&h, e)| (h, &e.monitor))
    }

    fn evict_one(&mut self) -> Option<u64> {
        if self.monitors.is_empty() {
            return None;
        }

        let floor = self.config.min_sessions_for_eviction;
        let candidate = self
            .monitors
            .iter()
            .filter(|(_, e)| e.monitor.stats().sessions_seen >= floor)
            .min_by(|a, b| {
                a.1.retention_score()
                    .partial_cmp(&b.1.retention_score())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(&h, _)| h)
            // Everything is still establishing its baseline: fall back to
            // the longest idle entry.
            .or_else(|| {
                self.monitors
                    .iter()
                    .min_by_key(|(_, e)| e.last_access)
                    .map(|(&h, _)| h)
            });

        let hash = candidate?;
        self.monitors.remove(&hash);
        self.stats.total_evictions += 1;
        tracing::debug!(hash, "evicted monitor");
        Some(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_registry(max: usize) -> MonitorRegistry {
        MonitorRegistry::with_config(
            MonitorConfig::default(),
            RegistryConfig {
                max_patients: max,
                min_sessions_for_eviction: 0,
            },
        )
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let mut registry = small_registry(10);
        registry.get_or_create("patient-a").ingest_value(10.0).unwrap();
        registry.get_or_create("patient-a").ingest_value(10.5).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_mut("patient-a").unwrap().series().len(), 2);
        assert_eq!(registry.stats().total_creations, 1);
    }

    #[test]
    fn test_series_are_isolated() {
        let mut registry = small_registry(10);
        registry.get_or_create("a").ingest_value(10.0).unwrap();
        registry.get_or_create("b").ingest_value(99.0).unwrap();

        assert_eq!(registry.get_mut("a").unwrap().series(), &[10.0]);
        assert_eq!(registry.get_mut("b").unwrap().series(), &[99.0]);
    }

    #[test]
    fn test_capacity_triggers_eviction() {
        let mut registry = small_registry(3);
        for id in ["a", "b", "c"] {
            registry.get_or_create(id).ingest_value(10.0).unwrap();
        }
        assert!(registry.is_full());

        registry.get_or_create("d");
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.stats().total_evictions, 1);
        assert!(registry.contains("d"));
    }

    #[test]
    fn test_established_monitors_outlive_fresh_ones() {
        let mut registry = small_registry(2);

        for _ in 0..20 {
            registry.get_or_create("established").ingest_value(10.0).unwrap();
        }
        registry.get_or_create("fresh").ingest_value(10.0).unwrap();

        registry.get_or_create("newcomer");
        assert!(
            registry.contains("established"),
            "the long-running monitor must survive eviction"
        );
        assert!(!registry.contains("fresh"));
    }

    #[test]
    fn test_eviction_shield_protects_learning_monitors() {
        let mut registry = MonitorRegistry::with_config(
            MonitorConfig::default(),
            RegistryConfig {
                max_patients: 2,
                min_sessions_for_eviction: 5,
            },
        );

        for _ in 0..20 {
            registry.get_or_create("established").ingest_value(10.0).unwrap();
        }
        registry.get_or_create("learning").ingest_value(10.0).unwrap();

        // Only the established monitor is past the shield, so it is the
        // one that makes room.
        registry.get_or_create("newcomer");
        assert!(registry.contains("learning"));
        assert!(!registry.contains("established"));
    }

    #[test]
    fn test_remove_returns_monitor() {
        let mut registry = small_registry(10);
        registry.get_or_create("a").ingest_value(12.0).unwrap();
        let monitor = registry.remove("a").unwrap();
        assert_eq!(monitor.series(), &[12.0]);
        assert!(!registry.contains("a"));
    }
}
