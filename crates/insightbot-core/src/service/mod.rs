//! Application services built on top of the port traits.

pub mod config;
pub mod conversation;
