use super::quantize::{dequantize, within_tolerance};
use crate::config::ReplicationConfig;
use crate::directory::{NoopListener, SimulationDirectory};
use crate::metrics::ReplicationMetrics;
use flocknet_data::NetId;
use flocknet_net::{LocationBatch, SpawnData};
use std::collections::HashMap;

/// Outcome of applying one location batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    /// Records matched to a local agent and not stale.
    pub applied: usize,
    /// Applied records that overwrote the local location.
    pub corrected: usize,
    /// Records whose id is not known locally.
    pub unresolved: usize,
    /// Records older than an update already applied to the same agent.
    pub stale: usize,
    /// Whether the batch arrived within the expected interval.
    pub on_time: bool,
}

/// Observer-side counterpart of the authoritative replicator.
pub struct ObservingReplicator {
    tolerance: f32,
    expected_interval: f64,
    time_threshold: f64,
    fingerprint: String,
    last_update_time: Option<f64>,
    last_steps: HashMap<NetId, i32>,
    metrics: ReplicationMetrics,
}

impl ObservingReplicator {
    pub fn new(config: &ReplicationConfig) -> Self {
        Self {
            tolerance: config.net_update_precision_tolerance,
            expected_interval: f64::from(config.batch_interval()),
            time_threshold: f64::from(config.net_update_time_threshold),
            fingerprint: config.fingerprint(),
            last_update_time: None,
            last_steps: HashMap::new(),
            metrics: ReplicationMetrics::new(),
        }
    }

    /// Spawns the agents not already present. Returns how many were created.
    pub fn apply_spawn(&mut self, directory: &mut SimulationDirectory, batch: &[SpawnData]) -> usize {
        let created = directory.spawn_agents(batch, &mut NoopListener).len();
        tracing::debug!(received = batch.len(), created, "Applied spawn message");
        created
    }

    pub fn apply_despawn(&mut self, directory: &mut SimulationDirectory, ids: &[NetId]) -> usize {
        let mut removed = 0;
        for id in ids {
            self.last_steps.remove(id);
            if directory.despawn_agent(*id, &mut NoopListener) {
                removed += 1;
            }
        }
        removed
    }

    /// Applies a location batch, hard-correcting agents that drifted past the tolerance.
    ///
    /// Records for unknown agents are dropped individually; the rest of the
    /// batch still applies. Applying the same batch twice is harmless.
    pub fn apply_batch(
        &mut self,
        directory: &mut SimulationDirectory,
        batch: &LocationBatch,
        now_secs: f64,
    ) -> ApplyReport {
        let mut report = ApplyReport {
            on_time: self.is_update_valid(now_secs),
            ..Default::default()
        };

        for record in &batch.records {
            let Some(handle) = directory.resolve(record.net_id) else {
                tracing::debug!(id = %record.net_id, step = batch.step_number, "Dropping update for unknown agent");
                self.metrics.record_dropped();
                report.unresolved += 1;
                continue;
            };

            let last_step = self.last_steps.entry(record.net_id).or_insert(batch.step_number);
            // Steps wrap at i32::MAX, so order them by signed distance.
            if batch.step_number.wrapping_sub(*last_step) < 0 {
                report.stale += 1;
                continue;
            }
            *last_step = batch.step_number;
            report.applied += 1;

            let received = dequantize([record.x, record.y, record.z], self.tolerance);
            let Some(local) = directory.location(handle) else {
                continue;
            };
            if !within_tolerance(received, local, self.tolerance) {
                directory.relocate_agent(handle, received);
                directory.set_velocity(handle, record.velocity());
                self.metrics.record_correction();
                report.corrected += 1;
            }
        }

        tracing::debug!(
            step = batch.step_number,
            applied = report.applied,
            corrected = report.corrected,
            unresolved = report.unresolved,
            stale = report.stale,
            "Applied location batch"
        );
        report
    }

    /// Checks the delay since the previous batch against the expected interval.
    ///
    /// The first call always succeeds. An out-of-tolerance delay is only
    /// logged; the batch is still applied.
    pub fn is_update_valid(&mut self, now_secs: f64) -> bool {
        let Some(last) = self.last_update_time.replace(now_secs) else {
            return true;
        };

        let lapse = now_secs - last;
        if (lapse - self.expected_interval).abs() <= self.time_threshold {
            return true;
        }

        tracing::warn!(
            now = now_secs,
            last = last,
            lapse = lapse,
            expected = self.expected_interval,
            "Location update outside expected interval"
        );
        self.metrics.record_suspect_update();
        false
    }

    /// Compares the authority's replication fingerprint with ours.
    pub fn verify_fingerprint(&self, remote: &str) -> anyhow::Result<()> {
        anyhow::ensure!(
            remote == self.fingerprint,
            "Replication config mismatch: authority {remote}, local {}",
            self.fingerprint
        );
        Ok(())
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn metrics(&self) -> &ReplicationMetrics {
        &self.metrics
    }
}
