//! # FlockNet IO
//!
//! Transport layer between an authority and its observers.
//!
//! This crate provides:
//! - Structured error handling with a crate-wide error type
//! - The JSON wire codec for [`flocknet_net::NetMessage`]
//! - Byte and message throughput statistics
//! - Outbound rate limiting and an in-process lossy link

/// Wire encoding of protocol messages
pub mod codec;
/// Error types and result aliases for transport operations
pub mod error;
/// Rate limiting and the in-process link
pub mod network;
/// Sliding-window throughput statistics
pub mod stats;

pub use codec::{decode, encode};
pub use error::{IoError, Result};
pub use network::flow_control::TokenBucket;
pub use network::link::LossyLink;
pub use stats::NetStats;
