//! # FlockNet Data
//!
//! Plain data shared by every FlockNet crate: agent components and the
//! axis-aligned box used by the spatial index.

pub mod data;

pub use data::agent::{Agent, Location, NetId, Velocity};
pub use data::geometry::Aabb;
pub use glam::Vec3;
