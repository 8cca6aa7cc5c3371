//! Traffic Allocator (component F): samples a traffic matrix and assigns
//! unit flows to routed paths under per-edge capacity enforcement.

pub mod phase;
pub mod strategy;
