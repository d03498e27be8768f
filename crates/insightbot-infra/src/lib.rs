//! Infrastructure layer for InsightBot.
//!
//! Contains implementations of the port traits defined in `insightbot-core`:
//! secret providers (Azure Key Vault, environment), the business data API
//! client, the Azure OpenAI chat provider, and the Bot Connector client used
//! to deliver replies.

pub mod azure;
pub mod config;
pub mod connector;
pub mod data_api;
pub mod llm;
pub mod secret;

#[cfg(test)]
pub(crate) mod testing;
