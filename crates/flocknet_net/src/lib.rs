//! Wire protocol shared by the authority and its observers.
//!
//! Two families of messages cross the network boundary: reliable, ordered
//! lifecycle messages (spawn / despawn) and unreliable location batches.

use flocknet_data::{Agent, NetId, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One agent in a spawn message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SpawnData {
    pub net_id: NetId,
    pub location: [f32; 3],
    pub velocity: [f32; 3],
}

impl SpawnData {
    pub fn new(net_id: NetId, location: Vec3, velocity: Vec3) -> Self {
        Self {
            net_id,
            location: location.to_array(),
            velocity: velocity.to_array(),
        }
    }

    pub fn location(&self) -> Vec3 {
        Vec3::from_array(self.location)
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::from_array(self.velocity)
    }
}

impl From<&Agent> for SpawnData {
    fn from(agent: &Agent) -> Self {
        Self::new(agent.id, agent.location, agent.velocity)
    }
}

/// Quantized location update for one agent.
///
/// `x`, `y`, `z` are the location divided by the precision tolerance; the
/// receiver multiplies them back by the same tolerance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct QuantizedLocation {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub net_id: NetId,
    pub velocity: [f32; 3],
}

impl QuantizedLocation {
    pub fn velocity(&self) -> Vec3 {
        Vec3::from_array(self.velocity)
    }
}

/// One scheduler tick worth of location updates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct LocationBatch {
    pub step_number: i32,
    pub records: Vec<QuantizedLocation>,
}

/// Delivery guarantee a message expects from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Acknowledged, retried, delivered in send order (possibly more than once).
    ReliableOrdered,
    /// Fire-and-forget.
    Unreliable,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum NetMessage {
    Handshake { client_id: Uuid },
    Welcome { config_fingerprint: String },
    SpawnAgents(Vec<SpawnData>),
    DespawnAgents(Vec<NetId>),
    LocationBatch(LocationBatch),
}

impl NetMessage {
    pub fn delivery(&self) -> Delivery {
        match self {
            NetMessage::LocationBatch(_) => Delivery::Unreliable,
            _ => Delivery::ReliableOrdered,
        }
    }
}
