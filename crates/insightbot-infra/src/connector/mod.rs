//! Outbound delivery of bot replies through the Bot Framework connector.

pub mod client;

pub use client::BotConnectorClient;
