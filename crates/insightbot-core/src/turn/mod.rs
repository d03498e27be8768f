//! Conversation turn handling: one state machine per inbound activity.

pub mod handler;

pub use handler::{TurnConfig, TurnHandler, TurnOutcome, TurnState};
