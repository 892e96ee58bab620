//! Agent registry bridging the ECS arena, the spatial indexes and the
//! network identifiers.

use crate::config::SimulationConfig;
use crate::octree::AgentOctree;
use crate::proximity_grid::ProximityGrid;
use flocknet_data::{Aabb, Agent, Location, NetId, Velocity};
use flocknet_net::SpawnData;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};

/// Internal reference to an agent record (arena index + generation).
pub type AgentHandle = hecs::Entity;

/// Receives lifecycle notifications from the directory.
///
/// The authoritative replicator uses it to maintain its roster; a renderer
/// would use it to create and destroy visual instances.
pub trait SpawnListener {
    fn on_agent_spawned(&mut self, agent: &Agent);
    fn on_agent_despawned(&mut self, id: NetId);
}

/// Listener that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl SpawnListener for NoopListener {
    fn on_agent_spawned(&mut self, _agent: &Agent) {}
    fn on_agent_despawned(&mut self, _id: NetId) {}
}

/// Owns every agent record and both spatial indexes.
///
/// The octree and the proximity grid mirror agent positions; they are only
/// mutated through [`SimulationDirectory::spawn_agents`],
/// [`SimulationDirectory::despawn_agent`] and
/// [`SimulationDirectory::relocate_agent`].
pub struct SimulationDirectory {
    world: hecs::World,
    octree: AgentOctree,
    grid: ProximityGrid<AgentHandle>,
    handles: HashMap<NetId, AgentHandle>,
    /// Agents outside the octree root bounds.
    unindexed: HashSet<NetId>,
    sight_radius: f32,
    debug_octree: bool,
}

impl SimulationDirectory {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            world: hecs::World::new(),
            octree: AgentOctree::new(Vec3::ZERO, config.simulation_extent_from_center as f32),
            grid: ProximityGrid::new(config.grid_cell_size),
            handles: HashMap::new(),
            unindexed: HashSet::new(),
            sight_radius: config.boid_sight_radius,
            debug_octree: config.debug_octree,
        }
    }

    /// Spawns every descriptor whose id is not yet present.
    ///
    /// Duplicates are skipped, which makes redelivered spawn messages harmless.
    /// Returns the handles of the agents actually created.
    pub fn spawn_agents(
        &mut self,
        batch: &[SpawnData],
        listener: &mut dyn SpawnListener,
    ) -> Vec<AgentHandle> {
        let mut spawned = Vec::with_capacity(batch.len());
        for data in batch {
            if self.handles.contains_key(&data.net_id) {
                tracing::debug!(id = %data.net_id, "Skipping spawn of existing agent");
                continue;
            }

            let agent = Agent::new(data.net_id, data.location(), data.velocity());
            let handle = self.world.spawn((
                agent.id,
                Location(agent.location),
                Velocity(agent.velocity),
            ));
            self.handles.insert(agent.id, handle);
            self.grid.insert_point(handle, agent.location);
            self.index(agent);

            if self.debug_octree {
                tracing::debug!(id = %agent.id, location = ?agent.location, "Spawned agent");
            }

            listener.on_agent_spawned(&agent);
            spawned.push(handle);
        }
        spawned
    }

    /// Removes an agent from every structure. Its handle becomes stale.
    pub fn despawn_agent(&mut self, id: NetId, listener: &mut dyn SpawnListener) -> bool {
        let Some(handle) = self.handles.remove(&id) else {
            return false;
        };
        self.octree.remove_by_key(&id);
        self.unindexed.remove(&id);
        self.grid.remove_point(&handle);
        if self.world.despawn(handle).is_err() {
            tracing::warn!(id = %id, "Directory held a dangling handle");
        }
        listener.on_agent_despawned(id);
        true
    }

    /// Moves an agent and re-registers it in both indexes.
    pub fn relocate_agent(&mut self, handle: AgentHandle, location: Vec3) -> bool {
        let agent = {
            let Ok((id, loc, vel)) = self
                .world
                .query_one_mut::<(&NetId, &mut Location, &Velocity)>(handle)
            else {
                return false;
            };
            if loc.0 == location {
                return true;
            }
            loc.0 = location;
            Agent::new(*id, location, vel.0)
        };

        self.grid.update_point(handle, location);
        self.octree.remove_by_key(&agent.id);
        self.index(agent);
        true
    }

    pub fn set_velocity(&mut self, handle: AgentHandle, velocity: Vec3) -> bool {
        match self.world.get::<&mut Velocity>(handle) {
            Ok(mut vel) => {
                vel.0 = velocity;
                true
            }
            Err(_) => false,
        }
    }

    pub fn resolve(&self, id: NetId) -> Option<AgentHandle> {
        self.handles.get(&id).copied()
    }

    pub fn agent(&self, handle: AgentHandle) -> Option<Agent> {
        let mut query = self
            .world
            .query_one::<(&NetId, &Location, &Velocity)>(handle)
            .ok()?;
        query
            .get()
            .map(|(id, loc, vel)| Agent::new(*id, loc.0, vel.0))
    }

    pub fn location(&self, handle: AgentHandle) -> Option<Vec3> {
        self.world.get::<&Location>(handle).ok().map(|loc| loc.0)
    }

    pub fn velocity(&self, handle: AgentHandle) -> Option<Vec3> {
        self.world.get::<&Velocity>(handle).ok().map(|vel| vel.0)
    }

    /// Handles of all live agents, in network-id order.
    pub fn handles(&self) -> Vec<AgentHandle> {
        let mut pairs: Vec<_> = self.handles.iter().map(|(id, h)| (*id, *h)).collect();
        pairs.sort_unstable_by_key(|(id, _)| *id);
        pairs.into_iter().map(|(_, h)| h).collect()
    }

    /// Snapshots of all live agents, in network-id order.
    pub fn agents(&self) -> Vec<Agent> {
        let mut agents: Vec<Agent> = self
            .world
            .query::<(&NetId, &Location, &Velocity)>()
            .iter()
            .map(|(_, (id, loc, vel))| Agent::new(*id, loc.0, vel.0))
            .collect();
        agents.sort_unstable_by_key(|a| a.id);
        agents
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of live agents the octree rejected (outside the simulation extent).
    #[inline]
    pub fn unindexed_count(&self) -> usize {
        self.unindexed.len()
    }

    pub fn octree(&self) -> &AgentOctree {
        &self.octree
    }

    /// All agents strictly within `radius` of `center` (Euclidean).
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<AgentHandle> {
        self.grid.find_points_in_ball(center, radius, |handle| {
            self.location(*handle)
                .map_or(f32::INFINITY, |loc| loc.distance_squared(center))
        })
    }

    /// Other agents within the configured sight radius of `handle`.
    pub fn neighbors(&self, handle: AgentHandle) -> Vec<AgentHandle> {
        let Some(center) = self.location(handle) else {
            return Vec::new();
        };
        let mut found = self.query_radius(center, self.sight_radius);
        found.retain(|other| *other != handle);
        found
    }

    /// Snapshots of all indexed agents whose location lies inside `query`.
    ///
    /// Snapshot locations are the ones recorded at the last spawn or relocate.
    pub fn query_box(&self, query: &Aabb) -> Vec<Agent> {
        self.octree.query_box(query)
    }

    /// Logs the octree layout at debug level when `debug_octree` is enabled.
    pub fn debug_octree(&self) {
        if !self.debug_octree {
            return;
        }
        self.octree.find_nodes_with_predicate(
            |_, node, _| self.octree.inclusive_len(node) > 0,
            |parent, node, bounds| {
                tracing::debug!(
                    node = node.index(),
                    parent = ?parent.map(|p| p.index()),
                    depth = self.octree.node_depth(node),
                    center = ?bounds.center,
                    extent = ?bounds.extent,
                    elements = self.octree.elements_for_node(node).len(),
                    "Octree node"
                );
                for agent in self.octree.elements_for_node(node) {
                    tracing::debug!(id = %agent.id, location = ?agent.location, "Octree element");
                }
            },
        );
    }

    fn index(&mut self, agent: Agent) {
        if self.octree.insert(agent) {
            self.unindexed.remove(&agent.id);
        } else if self.unindexed.insert(agent.id) {
            tracing::warn!(
                id = %agent.id,
                location = ?agent.location,
                "Agent outside simulation extent, not indexed"
            );
        }
    }
}

/// Random spawn descriptors for the authoritative side.
///
/// Owns the only random stream that affects shared state and the network id
/// counter, so it is never constructed by observers.
pub struct SpawnGenerator {
    rng: ChaCha8Rng,
    last_id: u16,
    max_distance: f32,
    max_speed: f32,
}

impl SpawnGenerator {
    pub fn new(config: &SimulationConfig) -> Self {
        let rng = if let Some(seed) = config.seed {
            ChaCha8Rng::seed_from_u64(seed)
        } else {
            ChaCha8Rng::from_entropy()
        };
        Self {
            rng,
            last_id: 0,
            max_distance: (config.simulation_extent_from_center as f32 / 2.0).max(10.0),
            max_speed: (config.boid_max_speed as f32).max(10.0),
        }
    }

    /// Produces up to `count` descriptors with fresh network ids.
    ///
    /// Locations lie within half the simulation extent, speeds within the
    /// configured maximum. Fewer than `count` are returned once ids run out.
    pub fn generate(&mut self, count: usize) -> Vec<SpawnData> {
        let mut batch = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(next) = self.last_id.checked_add(1) else {
                tracing::warn!(requested = count, generated = batch.len(), "Network ids exhausted");
                break;
            };
            self.last_id = next;

            let location =
                random_unit_vector(&mut self.rng) * self.rng.gen_range(10.0..=self.max_distance);
            let velocity =
                random_unit_vector(&mut self.rng) * self.rng.gen_range(10.0..=self.max_speed);
            batch.push(SpawnData::new(NetId(next), location, velocity));
        }
        batch
    }
}

/// Uniformly distributed direction on the unit sphere.
fn random_unit_vector<R: Rng>(rng: &mut R) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        let len_sq = v.length_squared();
        if len_sq > 1.0e-4 && len_sq <= 1.0 {
            return v / len_sq.sqrt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        spawned: Vec<NetId>,
        despawned: Vec<NetId>,
    }

    impl SpawnListener for Recorder {
        fn on_agent_spawned(&mut self, agent: &Agent) {
            self.spawned.push(agent.id);
        }
        fn on_agent_despawned(&mut self, id: NetId) {
            self.despawned.push(id);
        }
    }

    fn config() -> SimulationConfig {
        SimulationConfig {
            simulation_extent_from_center: 1000,
            seed: Some(7),
            ..Default::default()
        }
    }

    fn spawn(id: u16, x: f32) -> SpawnData {
        SpawnData::new(NetId(id), Vec3::new(x, 0.0, 0.0), Vec3::X)
    }

    #[test]
    fn test_spawn_registers_everywhere() {
        let mut dir = SimulationDirectory::new(&config());
        let mut rec = Recorder::default();
        let handles = dir.spawn_agents(&[spawn(1, 0.0), spawn(2, 50.0)], &mut rec);

        assert_eq!(handles.len(), 2);
        assert_eq!(rec.spawned, vec![NetId(1), NetId(2)]);
        assert_eq!(dir.resolve(NetId(2)), Some(handles[1]));
        assert_eq!(dir.octree().len(), 2);
        assert_eq!(dir.query_radius(Vec3::ZERO, 10.0), vec![handles[0]]);
    }

    #[test]
    fn test_spawn_is_idempotent() {
        let mut dir = SimulationDirectory::new(&config());
        let mut rec = Recorder::default();
        dir.spawn_agents(&[spawn(1, 0.0)], &mut rec);
        let again = dir.spawn_agents(&[spawn(1, 300.0)], &mut rec);

        assert!(again.is_empty());
        assert_eq!(dir.len(), 1);
        assert_eq!(rec.spawned.len(), 1);
        let handle = dir.resolve(NetId(1)).expect("spawned");
        assert_eq!(dir.location(handle), Some(Vec3::ZERO));
    }

    #[test]
    fn test_despawn_invalidates_handle() {
        let mut dir = SimulationDirectory::new(&config());
        let mut rec = Recorder::default();
        let handle = dir.spawn_agents(&[spawn(4, 5.0)], &mut rec)[0];

        assert!(dir.despawn_agent(NetId(4), &mut rec));
        assert!(!dir.despawn_agent(NetId(4), &mut rec));
        assert_eq!(rec.despawned, vec![NetId(4)]);
        assert!(dir.agent(handle).is_none());
        assert!(dir.octree().is_empty());
        assert!(dir.query_radius(Vec3::new(5.0, 0.0, 0.0), 1.0).is_empty());

        // A new agent never resolves through the stale handle.
        let fresh = dir.spawn_agents(&[spawn(4, 5.0)], &mut rec)[0];
        assert_ne!(fresh, handle);
        assert!(dir.location(handle).is_none());
    }

    #[test]
    fn test_relocate_updates_both_indexes() {
        let mut dir = SimulationDirectory::new(&config());
        let handle = dir.spawn_agents(&[spawn(1, 0.0)], &mut NoopListener)[0];

        assert!(dir.relocate_agent(handle, Vec3::new(400.0, 0.0, 0.0)));
        assert!(dir.query_radius(Vec3::ZERO, 10.0).is_empty());
        assert_eq!(dir.query_radius(Vec3::new(400.0, 0.0, 0.0), 1.0), vec![handle]);

        let boxed = dir.query_box(&Aabb::cube(Vec3::new(400.0, 0.0, 0.0), 1.0));
        assert_eq!(boxed.len(), 1);
        assert_eq!(boxed[0].location, Vec3::new(400.0, 0.0, 0.0));
    }

    #[test]
    fn test_neighbors_use_sight_radius() {
        let mut dir = SimulationDirectory::new(&SimulationConfig {
            boid_sight_radius: 60.0,
            ..config()
        });
        let handles = dir.spawn_agents(&[spawn(1, 0.0), spawn(2, 50.0), spawn(3, 100.0)], &mut NoopListener);

        assert_eq!(dir.neighbors(handles[0]), vec![handles[1]]);
        let mut middle = dir.neighbors(handles[1]);
        middle.sort_by_key(|h| dir.agent(*h).map(|a| a.id));
        assert_eq!(middle, vec![handles[0], handles[2]]);

        dir.despawn_agent(NetId(1), &mut NoopListener);
        assert!(dir.neighbors(handles[0]).is_empty());
    }

    #[test]
    fn test_out_of_extent_agent_is_unindexed() {
        let mut dir = SimulationDirectory::new(&config());
        let handle = dir.spawn_agents(&[spawn(1, 0.0)], &mut NoopListener)[0];

        dir.relocate_agent(handle, Vec3::new(5000.0, 0.0, 0.0));
        assert_eq!(dir.unindexed_count(), 1);
        assert!(dir.octree().is_empty());
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.query_radius(Vec3::new(5000.0, 0.0, 0.0), 1.0), vec![handle]);

        dir.relocate_agent(handle, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(dir.unindexed_count(), 0);
        assert_eq!(dir.octree().len(), 1);
    }

    #[test]
    fn test_generator_bounds_and_ids() {
        let cfg = config();
        let mut generator = SpawnGenerator::new(&cfg);
        let batch = generator.generate(200);

        assert_eq!(batch.len(), 200);
        for (i, data) in batch.iter().enumerate() {
            assert_eq!(data.net_id, NetId(i as u16 + 1));
            let dist = data.location().length();
            assert!((10.0 - 1e-3..=500.0 + 1e-3).contains(&dist), "distance {dist}");
            let speed = data.velocity().length();
            assert!((10.0 - 1e-3..=50.0 + 1e-3).contains(&speed), "speed {speed}");
        }
    }

    #[test]
    fn test_generator_is_deterministic_with_seed() {
        let cfg = config();
        let a = SpawnGenerator::new(&cfg).generate(20);
        let b = SpawnGenerator::new(&cfg).generate(20);
        assert_eq!(a, b);
    }

    #[test]
    fn test_generator_stops_when_ids_run_out() {
        let mut generator = SpawnGenerator::new(&config());
        generator.last_id = u16::MAX - 2;
        let batch = generator.generate(5);
        assert_eq!(batch.len(), 2);
        assert!(generator.generate(1).is_empty());
    }
}
