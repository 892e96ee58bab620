//! Authority and observer roles.
//!
//! Each session owns its own [`SimulationDirectory`] and the replicator
//! variant for its role. Sessions only exchange [`NetMessage`] values; moving
//! those across a transport is the caller's business.

use crate::config::AppConfig;
use crate::directory::{SimulationDirectory, SpawnGenerator};
use crate::movement;
use crate::replication::{ApplyReport, AuthoritativeReplicator, ObservingReplicator};
use flocknet_data::NetId;
use flocknet_net::{NetMessage, SpawnData};
use uuid::Uuid;

/// Authoritative side: spawns agents, simulates them and emits location batches.
pub struct AuthoritySession {
    config: AppConfig,
    directory: SimulationDirectory,
    replicator: AuthoritativeReplicator,
    generator: SpawnGenerator,
}

impl AuthoritySession {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            directory: SimulationDirectory::new(&config.simulation),
            replicator: AuthoritativeReplicator::new(&config.replication),
            generator: SpawnGenerator::new(&config.simulation),
            config,
        })
    }

    /// Reply to an observer handshake.
    pub fn welcome(&self, client_id: Uuid) -> NetMessage {
        tracing::info!(client = %client_id, "Observer joined");
        NetMessage::Welcome {
            config_fingerprint: self.config.replication.fingerprint(),
        }
    }

    /// Spawns the configured initial population.
    pub fn spawn_initial(&mut self) -> Option<NetMessage> {
        self.spawn_random(self.config.simulation.num_of_boids)
    }

    /// Spawns `count` random agents and returns the message announcing them.
    pub fn spawn_random(&mut self, count: usize) -> Option<NetMessage> {
        let batch = self.generator.generate(count);
        self.spawn(batch)
    }

    pub fn spawn(&mut self, batch: Vec<SpawnData>) -> Option<NetMessage> {
        let created = self.directory.spawn_agents(&batch, &mut self.replicator);
        if created.is_empty() {
            return None;
        }
        tracing::info!(spawned = created.len(), total = self.directory.len(), "Spawned agents");
        self.directory.debug_octree();
        Some(NetMessage::SpawnAgents(batch))
    }

    pub fn despawn(&mut self, ids: &[NetId]) -> Option<NetMessage> {
        let removed: Vec<NetId> = ids
            .iter()
            .copied()
            .filter(|id| self.directory.despawn_agent(*id, &mut self.replicator))
            .collect();
        if removed.is_empty() {
            None
        } else {
            Some(NetMessage::DespawnAgents(removed))
        }
    }

    /// Spawn message describing every live agent, for observers joining late.
    pub fn snapshot(&self) -> Option<NetMessage> {
        let agents = self.directory.agents();
        if agents.is_empty() {
            return None;
        }
        Some(NetMessage::SpawnAgents(agents.iter().map(SpawnData::from).collect()))
    }

    pub fn start_updates(&mut self) {
        self.replicator.start_updates();
    }

    pub fn stop_updates(&mut self) {
        self.replicator.stop_updates();
    }

    /// Advances the simulation by `dt` seconds and returns the batches to send.
    pub fn step(&mut self, dt: f32) -> Vec<NetMessage> {
        if !self.config.simulation.static_agents {
            movement::integrate(
                &mut self.directory,
                dt,
                self.config.simulation.simulation_extent_from_center as f32,
            );
        }
        self.replicator
            .advance(dt, &self.directory)
            .into_iter()
            .map(NetMessage::LocationBatch)
            .collect()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn directory(&self) -> &SimulationDirectory {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut SimulationDirectory {
        &mut self.directory
    }

    pub fn replicator(&self) -> &AuthoritativeReplicator {
        &self.replicator
    }
}

/// Observing side: mirrors the authority from the messages it receives.
pub struct ObserverSession {
    client_id: Uuid,
    config: AppConfig,
    directory: SimulationDirectory,
    replicator: ObservingReplicator,
    clock: f64,
    verified: bool,
}

impl ObserverSession {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            client_id: Uuid::new_v4(),
            directory: SimulationDirectory::new(&config.simulation),
            replicator: ObservingReplicator::new(&config.replication),
            config,
            clock: 0.0,
            verified: false,
        })
    }

    pub fn handshake(&self) -> NetMessage {
        NetMessage::Handshake {
            client_id: self.client_id,
        }
    }

    /// Simulates locally between corrections.
    pub fn step(&mut self, dt: f32) {
        self.clock += f64::from(dt);
        if !self.config.simulation.static_agents {
            movement::integrate(
                &mut self.directory,
                dt,
                self.config.simulation.simulation_extent_from_center as f32,
            );
        }
    }

    /// Applies one message from the authority.
    ///
    /// Fails only on a replication config mismatch in the welcome message.
    pub fn handle(&mut self, message: &NetMessage) -> anyhow::Result<Option<ApplyReport>> {
        match message {
            NetMessage::Welcome { config_fingerprint } => {
                self.replicator.verify_fingerprint(config_fingerprint)?;
                self.verified = true;
                tracing::info!(client = %self.client_id, "Replication config verified");
                Ok(None)
            }
            NetMessage::SpawnAgents(batch) => {
                self.replicator.apply_spawn(&mut self.directory, batch);
                Ok(None)
            }
            NetMessage::DespawnAgents(ids) => {
                self.replicator.apply_despawn(&mut self.directory, ids);
                Ok(None)
            }
            NetMessage::LocationBatch(batch) => Ok(Some(self.replicator.apply_batch(
                &mut self.directory,
                batch,
                self.clock,
            ))),
            NetMessage::Handshake { client_id } => {
                tracing::warn!(client = %client_id, "Observer received a handshake, ignoring");
                Ok(None)
            }
        }
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn directory(&self) -> &SimulationDirectory {
        &self.directory
    }

    pub fn replicator(&self) -> &ObservingReplicator {
        &self.replicator
    }
}
