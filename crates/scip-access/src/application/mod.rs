//! Application layer.

pub mod engine;

pub use engine::{clearance_gate, AccessControlEngine, Gate};
