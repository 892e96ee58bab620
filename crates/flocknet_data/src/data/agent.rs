use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Network-stable identifier of an agent.
///
/// Distinct from the simulation-side handle: a `NetId` is what crosses the
/// wire, a handle is what indexes local storage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NetId(pub u16);

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u16> for NetId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// World position of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(pub Vec3);

/// Velocity of an agent, in world units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Velocity(pub Vec3);

/// Value snapshot of an agent.
///
/// Stored by value in the octree, so equality is by `id` only: two snapshots
/// of the same agent taken at different positions compare equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Agent {
    pub id: NetId,
    pub location: Vec3,
    pub velocity: Vec3,
}

impl Agent {
    pub fn new(id: NetId, location: Vec3, velocity: Vec3) -> Self {
        Self {
            id,
            location,
            velocity,
        }
    }
}

impl PartialEq for Agent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Agent {}
