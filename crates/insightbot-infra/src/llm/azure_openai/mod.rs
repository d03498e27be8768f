//! Azure OpenAI chat-completions provider with function calling.

pub mod client;
pub mod types;

pub use client::AzureOpenAiProvider;
