//! Headless authority/observer harness for the flocknet crates.

pub mod app;
