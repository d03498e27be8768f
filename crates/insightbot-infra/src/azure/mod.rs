//! Azure identity plumbing shared by the Key Vault provider and the Bot
//! Connector client.

pub mod identity;
pub mod token;

pub use identity::ManagedIdentityCredential;
pub use token::{TokenCache, TokenResponse};
