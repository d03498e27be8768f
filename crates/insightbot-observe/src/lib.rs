//! Observability for InsightBot: subscriber setup and GenAI span helpers.

pub mod genai_attrs;
pub mod tracing_setup;
