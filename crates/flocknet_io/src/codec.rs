//! JSON wire codec.

use crate::error::{IoError, Result};
use flocknet_net::NetMessage;

/// Encodes a message into its wire bytes.
pub fn encode(message: &NetMessage) -> Result<Vec<u8>> {
    serde_json::to_vec(message)
        .map_err(|e| IoError::serialization(format!("Message encoding failed: {}", e)))
}

/// Decodes wire bytes into a message.
///
/// # Errors
/// `IoError::Validation` for an empty payload, `IoError::Json` for malformed input.
pub fn decode(bytes: &[u8]) -> Result<NetMessage> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(IoError::validation("Empty message payload"));
    }
    Ok(serde_json::from_slice(bytes)?)
}
