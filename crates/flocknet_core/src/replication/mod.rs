//! Location replication between the authority and its observers.
//!
//! The authority runs [`AuthoritativeReplicator`]: an interval timer slices
//! the roster into `batches_per_update` batches per cycle, and each tick emits
//! the quantized locations of the agents that moved. Observers run
//! [`ObservingReplicator`], which applies spawn messages idempotently and
//! hard-corrects agents that drifted past the precision tolerance.

pub mod authoritative;
pub mod observing;
pub mod quantize;
pub mod timer;

pub use authoritative::AuthoritativeReplicator;
pub use observing::{ApplyReport, ObservingReplicator};
pub use quantize::{dequantize, quantize};
pub use timer::{TimerState, UpdateTimer, MAX_TICKS_PER_ADVANCE};
