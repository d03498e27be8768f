//! Business logic and port trait definitions for InsightBot.
//!
//! This crate defines the "ports" (secret providers, LLM providers, the
//! business data source) that the infrastructure layer implements, plus the
//! message-turn pipeline built on top of them. It depends on
//! `insightbot-types` and the span conventions in `insightbot-observe` --
//! never on `insightbot-infra` or any HTTP crate.

pub mod agent;
pub mod capability;
pub mod insights;
pub mod llm;
pub mod observe;
pub mod repository;
pub mod service;
pub mod turn;
