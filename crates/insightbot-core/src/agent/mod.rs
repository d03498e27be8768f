//! LLM orchestration: the tool-calling loop behind each delegated turn.

pub mod orchestrator;
pub mod prompt;

pub use orchestrator::{OrchestrationError, Orchestrator, OrchestratorConfig};
