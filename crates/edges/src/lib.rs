//! Edge Aggregation (component E): inverts routed path data into per-edge
//! centrality, paths-through, and coverage-weight indices.

pub mod phase;
pub mod strategy;
