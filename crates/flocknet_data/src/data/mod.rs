//! Core data structures for the FlockNet simulation.

pub mod agent;
pub mod geometry;
