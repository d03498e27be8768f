//! Shared domain types for InsightBot.
//!
//! This crate contains the types exchanged across the InsightBot service:
//! business records read from the data API, Bot Framework activities,
//! LLM request/response shapes, configuration, and error enums.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod activity;
pub mod business;
pub mod config;
pub mod conversation;
pub mod error;
pub mod insights;
pub mod llm;
pub mod secret;
