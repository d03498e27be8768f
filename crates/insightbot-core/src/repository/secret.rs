//! Secret provider trait definition.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use insightbot_types::error::SecretError;
use insightbot_types::secret::SecretSource;

/// Trait for read-only secret backends (Key Vault, environment).
///
/// The `ConfigResolver` chains providers in priority order; the first one
/// that returns a non-empty value wins.
pub trait SecretProvider: Send + Sync {
    /// Which backend this provider reads from.
    fn source(&self) -> SecretSource;

    /// Retrieve a setting by its logical name.
    /// Returns `None` if the provider has no value for it.
    fn get(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, SecretError>> + Send;
}

/// Object-safe version of [`SecretProvider`] with a boxed future.
pub trait SecretProviderDyn: Send + Sync {
    fn source(&self) -> SecretSource;

    fn get_boxed<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, SecretError>> + Send + 'a>>;
}

impl<T: SecretProvider> SecretProviderDyn for T {
    fn source(&self) -> SecretSource {
        SecretProvider::source(self)
    }

    fn get_boxed<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, SecretError>> + Send + 'a>> {
        Box::pin(self.get(name))
    }
}

/// Shared, type-erased secret provider.
pub type DynSecretProvider = Arc<dyn SecretProviderDyn>;
