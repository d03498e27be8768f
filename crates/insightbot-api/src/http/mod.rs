//! HTTP layer: the Bot Framework messaging endpoint and a health probe.

pub mod error;
pub mod handlers;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;
