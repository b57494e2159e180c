//! # Shopfloor Vault
//!
//! Encryption of sensitive purchase fields.
//!
//! - [`TransitClient`]: HashiCorp Vault Transit engine over HTTP
//! - [`DigestEncryptor`]: keyless, one-way SHA-256 fallback
//! - [`EncryptionProvider`]: per-field policy that tries Vault and degrades to the
//!   fallback, so a purchase never stores plaintext and never fails on encryption
//!
//! ## Example
//!
//! ```no_run
//! use shopfloor_vault::{EncryptionProvider, TransitClient};
//! use shopfloor_core::encryption::Encryptor;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // None when VAULT_ADDR is unset
//! let client = TransitClient::from_env()?;
//! let key_name = client
//!     .as_ref()
//!     .map_or_else(|| "shopfloor-key".to_string(), |c| c.config().key_name.clone());
//!
//! let provider = EncryptionProvider::from_optional(
//!     client.map(|c| Arc::new(c) as Arc<dyn Encryptor>),
//! );
//! let stored = provider.protect("phone", &key_name, "555-0100").await;
//! println!("{stored:?}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod digest;
pub mod error;
pub mod provider;

// Re-export main types for convenience
pub use client::{TransitClient, VaultConfig};
pub use digest::{DigestEncryptor, FALLBACK_TAG, digest, is_fallback};
pub use error::VaultError;
pub use provider::{EncryptionProvider, FallbackReason};
