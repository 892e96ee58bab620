use super::quantize::quantize;
use super::timer::{TimerState, UpdateTimer};
use crate::config::ReplicationConfig;
use crate::directory::{SimulationDirectory, SpawnListener};
use crate::metrics::ReplicationMetrics;
use flocknet_data::{Agent, NetId};
use flocknet_net::{LocationBatch, QuantizedLocation};
use glam::Vec3;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// Authority-side scheduler deciding which agent locations go on the wire.
///
/// Every full cycle (`batches_per_update` ticks) sweeps the whole roster
/// once. Each tick takes an even share of the agents not yet visited in the
/// cycle; the last tick of a cycle takes whatever remains.
///
/// An agent's first visit only seeds its cached location, so newly spawned
/// agents produce their first record one cycle after they join. Spawn
/// messages already carry their initial location.
pub struct AuthoritativeReplicator {
    batches_per_update: u8,
    tolerance: f32,
    timer: UpdateTimer,
    roster: Vec<NetId>,
    members: HashSet<NetId>,
    cached: HashMap<NetId, Vec3>,
    pending: Vec<QuantizedLocation>,
    current_index: usize,
    current_batch_index: u8,
    step_number: i32,
    last_visited: usize,
    metrics: ReplicationMetrics,
}

impl AuthoritativeReplicator {
    pub fn new(config: &ReplicationConfig) -> Self {
        let batches_per_update = config.batches_per_update.max(1);
        Self {
            batches_per_update,
            tolerance: config.net_update_precision_tolerance,
            timer: UpdateTimer::new(config.location_update_frequency / f32::from(batches_per_update)),
            roster: Vec::new(),
            members: HashSet::new(),
            cached: HashMap::new(),
            pending: Vec::new(),
            current_index: 0,
            current_batch_index: 0,
            step_number: 0,
            last_visited: 0,
            metrics: ReplicationMetrics::new(),
        }
    }

    /// Appends an agent to the roster. Already-present ids are ignored.
    pub fn add_agent(&mut self, id: NetId) {
        if self.members.insert(id) {
            self.roster.push(id);
        }
    }

    /// Drops an agent from the roster and forgets its cached location.
    pub fn remove_agent(&mut self, id: NetId) -> bool {
        if !self.members.remove(&id) {
            return false;
        }
        self.cached.remove(&id);
        if let Some(pos) = self.roster.iter().position(|other| *other == id) {
            self.roster.remove(pos);
            // Keep pointing at the first agent not yet visited this cycle.
            if pos < self.current_index {
                self.current_index -= 1;
            }
        }
        true
    }

    pub fn start_updates(&mut self) {
        tracing::info!(
            interval = self.timer.interval(),
            batches_per_update = self.batches_per_update,
            roster = self.roster.len(),
            "Starting location updates"
        );
        self.timer.start();
    }

    pub fn stop_updates(&mut self) {
        tracing::info!(step = self.step_number, "Stopping location updates");
        self.timer.stop();
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.timer.state() == TimerState::Armed
    }

    /// Feeds elapsed time to the timer and runs one tick per elapsed interval.
    pub fn advance(&mut self, dt: f32, directory: &SimulationDirectory) -> Vec<LocationBatch> {
        let ticks = self.timer.advance(dt);
        let mut batches = Vec::new();
        for _ in 0..ticks {
            if let Some(batch) = self.check_locations(directory) {
                batches.push(batch);
            }
        }
        batches
    }

    /// Runs one scheduler tick.
    ///
    /// Returns the batch to send, or `None` when no visited agent moved.
    pub fn check_locations(&mut self, directory: &SimulationDirectory) -> Option<LocationBatch> {
        self.step_number = self.step_number.wrapping_add(1);
        self.last_visited = 0;

        let pending = self.roster.len().saturating_sub(self.current_index);
        if pending > 0 {
            let batches_remaining = usize::from(self.batches_per_update - self.current_batch_index);
            let mut count = pending / batches_remaining;
            if count == 0 {
                count = pending;
            }

            let end = self.current_index + count;
            while self.current_index < end {
                let id = self.roster[self.current_index];
                self.current_index += 1;
                self.last_visited += 1;
                self.visit(id, directory);
            }
        }

        self.current_batch_index = (self.current_batch_index + 1) % self.batches_per_update;
        if self.current_batch_index == 0 {
            self.current_index = 0;
        }

        let records = std::mem::take(&mut self.pending);
        self.metrics.record_tick(self.last_visited, records.len());
        if records.is_empty() {
            return None;
        }

        tracing::debug!(
            step = self.step_number,
            visited = self.last_visited,
            records = records.len(),
            "Flushing location batch"
        );
        Some(LocationBatch {
            step_number: self.step_number,
            records,
        })
    }

    fn visit(&mut self, id: NetId, directory: &SimulationDirectory) {
        let Some(agent) = directory.resolve(id).and_then(|handle| directory.agent(handle)) else {
            tracing::warn!(id = %id, "Roster agent missing from directory");
            return;
        };

        match self.cached.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(agent.location);
            }
            Entry::Occupied(mut slot) => {
                if *slot.get() != agent.location {
                    slot.insert(agent.location);
                    let [x, y, z] = quantize(agent.location, self.tolerance);
                    self.pending.push(QuantizedLocation {
                        x,
                        y,
                        z,
                        net_id: id,
                        velocity: agent.velocity.to_array(),
                    });
                }
            }
        }
    }

    pub fn roster(&self) -> &[NetId] {
        &self.roster
    }

    pub fn cached_location(&self, id: NetId) -> Option<Vec3> {
        self.cached.get(&id).copied()
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[inline]
    pub fn current_batch_index(&self) -> u8 {
        self.current_batch_index
    }

    #[inline]
    pub fn step_number(&self) -> i32 {
        self.step_number
    }

    /// Agents visited by the most recent tick.
    #[inline]
    pub fn last_visited(&self) -> usize {
        self.last_visited
    }

    pub fn metrics(&self) -> &ReplicationMetrics {
        &self.metrics
    }
}

impl SpawnListener for AuthoritativeReplicator {
    fn on_agent_spawned(&mut self, agent: &Agent) {
        self.add_agent(agent.id);
    }

    fn on_agent_despawned(&mut self, id: NetId) {
        self.remove_agent(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use flocknet_net::SpawnData;

    fn setup(agents: u16, batches: u8) -> (SimulationDirectory, AuthoritativeReplicator) {
        let mut dir = SimulationDirectory::new(&SimulationConfig::default());
        let mut replicator = AuthoritativeReplicator::new(&ReplicationConfig {
            batches_per_update: batches,
            ..Default::default()
        });
        let data: Vec<SpawnData> = (1..=agents)
            .map(|i| SpawnData::new(NetId(i), Vec3::new(f32::from(i), 0.0, 0.0), Vec3::X))
            .collect();
        dir.spawn_agents(&data, &mut replicator);
        (dir, replicator)
    }

    fn run_cycle(dir: &SimulationDirectory, replicator: &mut AuthoritativeReplicator) -> Vec<LocationBatch> {
        (0..replicator.batches_per_update)
            .filter_map(|_| replicator.check_locations(dir))
            .collect()
    }

    #[test]
    fn test_first_tick_visits_one_slice() {
        let (dir, mut replicator) = setup(100, 10);
        assert!(replicator.check_locations(&dir).is_none());
        assert_eq!(replicator.last_visited(), 10);
        assert_eq!(replicator.current_batch_index(), 1);
        assert_eq!(replicator.current_index(), 10);
    }

    #[test]
    fn test_cycle_visits_every_agent_once() {
        for (agents, batches) in [(100, 10), (15, 10), (7, 10), (1, 3), (33, 4)] {
            let (dir, mut replicator) = setup(agents, batches);
            let mut total = 0;
            for _ in 0..batches {
                replicator.check_locations(&dir);
                total += replicator.last_visited();
            }
            assert_eq!(total, usize::from(agents), "{agents} agents / {batches} batches");
            assert_eq!(replicator.current_index(), 0);
            assert_eq!(replicator.current_batch_index(), 0);
        }
    }

    #[test]
    fn test_moved_agent_is_quantized() {
        let mut dir = SimulationDirectory::new(&SimulationConfig::default());
        let mut replicator = AuthoritativeReplicator::new(&ReplicationConfig {
            batches_per_update: 1,
            ..Default::default()
        });
        let handle = dir.spawn_agents(
            &[SpawnData::new(NetId(1), Vec3::ZERO, Vec3::Y)],
            &mut replicator,
        )[0];

        // First visit seeds the cache only.
        assert!(replicator.check_locations(&dir).is_none());
        assert_eq!(replicator.cached_location(NetId(1)), Some(Vec3::ZERO));

        dir.relocate_agent(handle, Vec3::new(5.0, 0.0, 0.0));
        let batch = replicator.check_locations(&dir).expect("moved agent");
        assert_eq!(batch.step_number, 2);
        assert_eq!(batch.records.len(), 1);
        let record = batch.records[0];
        assert_eq!((record.x, record.y, record.z), (2, 0, 0));
        assert_eq!(record.net_id, NetId(1));
        assert_eq!(record.velocity(), Vec3::Y);
    }

    #[test]
    fn test_no_send_without_movement() {
        let (dir, mut replicator) = setup(20, 4);
        assert!(run_cycle(&dir, &mut replicator).is_empty());
        assert!(run_cycle(&dir, &mut replicator).is_empty());
        assert_eq!(replicator.metrics().records_sent(), 0);
        assert_eq!(replicator.step_number(), 8);
    }

    #[test]
    fn test_only_moved_agents_are_sent() {
        let (mut dir, mut replicator) = setup(20, 4);
        run_cycle(&dir, &mut replicator);

        for id in [3u16, 17] {
            let handle = dir.resolve(NetId(id)).expect("spawned");
            dir.relocate_agent(handle, Vec3::new(0.0, 100.0, 0.0));
        }
        let batches = run_cycle(&dir, &mut replicator);
        let mut ids: Vec<NetId> = batches
            .iter()
            .flat_map(|b| b.records.iter().map(|r| r.net_id))
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![NetId(3), NetId(17)]);
    }

    #[test]
    fn test_empty_roster_is_noop() {
        let dir = SimulationDirectory::new(&SimulationConfig::default());
        let mut replicator = AuthoritativeReplicator::new(&ReplicationConfig::default());
        assert!(replicator.check_locations(&dir).is_none());
        assert_eq!(replicator.step_number(), 1);
        assert_eq!(replicator.last_visited(), 0);
    }

    #[test]
    fn test_despawn_updates_roster_and_index() {
        let (mut dir, mut replicator) = setup(10, 2);
        replicator.check_locations(&dir);
        assert_eq!(replicator.current_index(), 5);

        dir.despawn_agent(NetId(2), &mut replicator);
        assert_eq!(replicator.roster().len(), 9);
        assert_eq!(replicator.current_index(), 4);
        assert!(replicator.cached_location(NetId(2)).is_none());

        replicator.check_locations(&dir);
        assert_eq!(replicator.last_visited(), 5);
        assert_eq!(replicator.current_index(), 0);
    }

    #[test]
    fn test_duplicate_add_is_ignored() {
        let (_, mut replicator) = setup(3, 1);
        replicator.add_agent(NetId(2));
        assert_eq!(replicator.roster().len(), 3);
    }

    #[test]
    fn test_advance_runs_ticks_only_when_armed() {
        let (mut dir, mut replicator) = setup(4, 2);
        assert!(replicator.advance(10.0, &dir).is_empty());
        assert_eq!(replicator.step_number(), 0);

        replicator.start_updates();
        replicator.advance(1.0, &dir);
        assert_eq!(replicator.step_number(), 2);

        let handle = dir.resolve(NetId(1)).expect("spawned");
        dir.relocate_agent(handle, Vec3::new(50.0, 0.0, 0.0));
        let batches = replicator.advance(0.5, &dir);
        assert_eq!(batches.len(), 1);

        replicator.stop_updates();
        assert!(!replicator.is_running());
        assert!(replicator.advance(5.0, &dir).is_empty());
    }
}
