//! Routing (component D): per-sd-pair path computation over the shared ISL
//! network, plus the phase that assembles the full path-data map.

pub mod graph;
pub mod phase;
pub mod strategy;
