//! Configuration management for simulation and replication parameters.
//!
//! This module provides strongly-typed configuration structures that map to
//! the `config.toml` file.
//!
//! ## Configuration Hierarchy
//!
//! 1. Default values (hardcoded in `Default` impls)
//! 2. `config.toml` file (overrides defaults)
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [simulation]
//! num_of_boids = 1000
//! simulation_extent_from_center = 10000
//!
//! [replication]
//! batches_per_update = 10
//! location_update_frequency = 1.0
//! net_update_precision_tolerance = 2.0
//! ```

use serde::{Deserialize, Serialize};

/// Population and world-extent parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    /// Initial population spawned by the authority.
    pub num_of_boids: usize,
    /// Half-extent of the octree root bounds, centered at the origin.
    pub simulation_extent_from_center: i32,
    pub boid_max_speed: i32,
    pub boid_sight_radius: f32,
    /// Proximity grid cell size in world units.
    pub grid_cell_size: f32,
    pub seed: Option<u64>,
    /// Agents keep their spawn location (movement integration is skipped).
    pub static_agents: bool,
    /// Dump the octree node layout at debug level after spawning.
    pub debug_octree: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_of_boids: 1000,
            simulation_extent_from_center: 10000,
            boid_max_speed: 50,
            boid_sight_radius: 100.0,
            grid_cell_size: 100.0,
            seed: None,
            static_agents: false,
            debug_octree: false,
        }
    }
}

/// Shortest accepted time between two scheduler ticks, in seconds.
pub const MIN_BATCH_INTERVAL: f32 = 0.001;

/// Network update scheduling parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ReplicationConfig {
    /// How many slices each full update cycle is divided into.
    pub batches_per_update: u8,
    /// Seconds per full update cycle.
    pub location_update_frequency: f32,
    /// Quantization step; also the divergence threshold on observers.
    pub net_update_precision_tolerance: f32,
    /// Allowed jitter, in seconds, between consecutive batches.
    pub net_update_time_threshold: f32,
    /// Outbound cap for location batches. `None` disables the cap.
    pub max_outbound_bytes_per_sec: Option<f64>,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            batches_per_update: 10,
            location_update_frequency: 1.0,
            net_update_precision_tolerance: 2.0,
            net_update_time_threshold: 0.03,
            max_outbound_bytes_per_sec: None,
        }
    }
}

impl ReplicationConfig {
    /// Seconds between two scheduler ticks.
    #[must_use]
    pub fn batch_interval(&self) -> f32 {
        self.location_update_frequency / f32::from(self.batches_per_update)
    }

    /// Digest of the parameters both ends must agree on.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update([self.batches_per_update]);
        hasher.update(self.location_update_frequency.to_le_bytes());
        hasher.update(self.net_update_precision_tolerance.to_le_bytes());
        hasher.update(self.net_update_time_threshold.to_le_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Flocking weights. Consumed by behaviour code outside this workspace.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FlockingConfig {
    pub target_weight: f32,
    pub align_weight: f32,
    pub separation_weight: f32,
    pub cohesion_weight: f32,
}

impl Default for FlockingConfig {
    fn default() -> Self {
        Self {
            target_weight: 0.001,
            align_weight: 0.5,
            separation_weight: 0.5,
            cohesion_weight: 0.5,
        }
    }
}

/// Loopback link used by the headless harness.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LinkConfig {
    /// Probability that an unreliable message is lost.
    pub drop_rate: f64,
    /// Number of observing sessions attached to the authority.
    pub observers: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            drop_rate: 0.0,
            observers: 1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub replication: ReplicationConfig,
    pub flocking: FlockingConfig,
    pub link: LinkConfig,
    pub target_fps: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            replication: ReplicationConfig::default(),
            flocking: FlockingConfig::default(),
            link: LinkConfig::default(),
            target_fps: 60,
        }
    }
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a description
    /// of the first validation failure. A zero `batches_per_update` is rejected
    /// here so the scheduler never divides by zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        // Simulation validation
        anyhow::ensure!(
            self.simulation.simulation_extent_from_center > 0,
            "Simulation extent must be positive"
        );
        anyhow::ensure!(
            self.simulation.num_of_boids <= usize::from(u16::MAX),
            "Too many boids (max {})",
            u16::MAX
        );
        anyhow::ensure!(
            self.simulation.boid_max_speed >= 10,
            "Boid max speed must be at least 10"
        );
        anyhow::ensure!(
            self.simulation.boid_sight_radius >= 0.0,
            "Boid sight radius must be non-negative"
        );
        anyhow::ensure!(
            self.simulation.grid_cell_size > 0.0 && self.simulation.grid_cell_size.is_finite(),
            "Grid cell size must be positive"
        );

        // Replication validation
        anyhow::ensure!(
            self.replication.batches_per_update > 0,
            "Batches per update must be positive"
        );
        anyhow::ensure!(
            self.replication.location_update_frequency > 0.0,
            "Location update frequency must be positive"
        );
        anyhow::ensure!(
            self.replication.net_update_precision_tolerance > 0.0,
            "Net update precision tolerance must be positive"
        );
        let wire_span =
            self.simulation.simulation_extent_from_center as f32 / self.replication.net_update_precision_tolerance;
        anyhow::ensure!(
            wire_span <= f32::from(i16::MAX),
            "Simulation extent {} does not fit the i16 wire range at tolerance {} (max extent {})",
            self.simulation.simulation_extent_from_center,
            self.replication.net_update_precision_tolerance,
            f32::from(i16::MAX) * self.replication.net_update_precision_tolerance
        );
        anyhow::ensure!(
            self.replication.batch_interval() >= MIN_BATCH_INTERVAL,
            "Batch interval {}s is below the {}s floor",
            self.replication.batch_interval(),
            MIN_BATCH_INTERVAL
        );
        anyhow::ensure!(
            self.replication.net_update_time_threshold >= 0.0,
            "Net update time threshold must be non-negative"
        );
        if let Some(cap) = self.replication.max_outbound_bytes_per_sec {
            anyhow::ensure!(cap > 0.0, "Outbound byte cap must be positive");
        }

        // Link validation
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.link.drop_rate),
            "Drop rate must be in [0.0, 1.0]"
        );

        anyhow::ensure!(self.target_fps > 0, "Target FPS must be positive");
        anyhow::ensure!(self.target_fps <= 240, "Target FPS too high (max 240)");

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }
}
