//! # FlockNet Core
//!
//! Spatial indexing and location replication for a population of boids
//! shared between one authority and any number of observers.
//!
//! This crate contains:
//! - A bounded octree with incremental insert/remove and box queries
//! - A hashed proximity grid for radius queries
//! - The simulation directory tying network ids to agent records
//! - The batched, quantized location replication scheduler
//! - Replication metrics
//!
//! ## Example
//!
//! ```
//! use flocknet_core::config::AppConfig;
//! use flocknet_core::session::{AuthoritySession, ObserverSession};
//!
//! let mut config = AppConfig::default();
//! config.simulation.num_of_boids = 10;
//! config.simulation.seed = Some(42);
//!
//! let mut authority = AuthoritySession::new(config.clone()).unwrap();
//! let mut observer = ObserverSession::new(config).unwrap();
//!
//! let spawn = authority.spawn_initial().unwrap();
//! observer.handle(&spawn).unwrap();
//! assert_eq!(observer.directory().len(), 10);
//! ```

/// Configuration management for simulation and replication parameters
pub mod config;
/// Agent registry over the ECS arena and both spatial indexes
pub mod directory;
/// Replication counters and structured logging
pub mod metrics;
/// Velocity integration with reflection at the world boundary
pub mod movement;
/// Bounded octree over agent locations
pub mod octree;
/// Hashed uniform grid for radius queries
pub mod proximity_grid;
/// Batched, quantized location replication
pub mod replication;
/// Authority and observer sessions
pub mod session;

pub use directory::{AgentHandle, SimulationDirectory, SpawnListener};
pub use metrics::ReplicationMetrics;
pub use session::{AuthoritySession, ObserverSession};
