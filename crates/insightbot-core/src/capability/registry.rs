//! Name-to-handler capability registry.
//!
//! Each capability pairs a tool definition (what the model sees) with an
//! async handler closure. Typed registration deserializes the model's JSON
//! arguments into a concrete struct before the handler runs.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use insightbot_types::error::CapabilityError;
use insightbot_types::llm::ToolDefinition;

/// Boxed future returned by every capability handler.
pub type CapabilityFuture = Pin<Box<dyn Future<Output = Result<String, CapabilityError>> + Send>>;

type Handler = Arc<dyn Fn(serde_json::Value) -> CapabilityFuture + Send + Sync>;

/// A registered capability.
#[derive(Clone)]
pub struct Capability {
    definition: ToolDefinition,
    handler: Handler,
}

impl Capability {
    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.definition.name)
            .finish_non_exhaustive()
    }
}

/// Registry of callable capabilities, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<String, Capability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler that receives the raw JSON arguments.
    ///
    /// Registering a name twice replaces the earlier handler.
    pub fn register<F, Fut>(
        &mut self,
        name: &str,
        description: &str,
        parameters: serde_json::Value,
        handler: F,
    ) where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, CapabilityError>> + Send + 'static,
    {
        let handler: Handler =
            Arc::new(move |args: serde_json::Value| -> CapabilityFuture { Box::pin(handler(args)) });
        self.entries.insert(
            name.to_string(),
            Capability {
                definition: ToolDefinition {
                    name: name.to_string(),
                    description: description.to_string(),
                    parameters,
                },
                handler,
            },
        );
    }

    /// Register a handler whose arguments are deserialized into `A` first.
    ///
    /// Arguments that do not match `A` produce `CapabilityError::InvalidArguments`
    /// without calling the handler.
    pub fn register_typed<A, F, Fut>(
        &mut self,
        name: &str,
        description: &str,
        parameters: serde_json::Value,
        handler: F,
    ) where
        A: DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, CapabilityError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.register(name, description, parameters, move |raw| {
            let handler = Arc::clone(&handler);
            async move {
                // Models sometimes send `null` for a function with no arguments.
                let raw = if raw.is_null() {
                    serde_json::Value::Object(Default::default())
                } else {
                    raw
                };
                let args: A = serde_json::from_value(raw)
                    .map_err(|e| CapabilityError::InvalidArguments(e.to_string()))?;
                handler(args).await
            }
        });
    }

    /// Tool definitions offered to the model, in name order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries
            .values()
            .map(|c| c.definition.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke a capability by name.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<String, CapabilityError> {
        let capability = self
            .entries
            .get(name)
            .ok_or_else(|| CapabilityError::Unknown(name.to_string()))?;
        (capability.handler)(arguments).await
    }
}
