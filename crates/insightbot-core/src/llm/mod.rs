//! LLM provider abstraction.
//!
//! `LlmProvider` is the RPITIT trait that backends implement;
//! `BoxLlmProvider` erases the concrete type so the orchestrator can hold
//! whichever backend the process was configured with.

pub mod box_provider;
pub mod provider;
