/// Rate-limiting mechanisms for outbound traffic.
pub mod flow_control;
/// In-process link with a reliable lane and a lossy lane.
pub mod link;
