//! Secret provider implementations.
//!
//! - `keyvault`: Azure Key Vault over REST, authenticated with managed identity
//! - `env`: Environment variable provider (read-only, last link in the chain)
//! - `chain`: Secret chain builder wiring the providers together

pub mod chain;
pub mod env;
pub mod keyvault;

pub use chain::build_secret_chain;
pub use env::EnvSecretProvider;
pub use keyvault::KeyVaultSecretProvider;
