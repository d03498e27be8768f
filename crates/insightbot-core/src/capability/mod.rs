//! Functions the model may call during a turn.

pub mod business;
pub mod registry;
pub mod render;

pub use registry::{Capability, CapabilityRegistry};
