//! Port trait definitions.
//!
//! These traits define the external interfaces that the infrastructure layer
//! (insightbot-infra) implements. The core crate never depends on a specific
//! secret store or HTTP backend.

pub mod data;
pub mod secret;
