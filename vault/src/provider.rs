//! Per-field encryption with fallback.
//!
//! Each call decides independently: try the primary if it reports itself available,
//! otherwise (or when it fails) return the digest fallback. A call never fails and
//! never returns plaintext.

use crate::digest::digest;
use shopfloor_core::encryption::Encryptor;
use shopfloor_core::purchase::Ciphertext;
use std::sync::Arc;

/// Why the fallback was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No primary configured, or it reported itself unavailable
    Unavailable,
    /// The primary was tried and failed
    Failed,
}

impl FallbackReason {
    /// Metric label value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Failed => "failed",
        }
    }
}

/// Encryption policy used for purchase fields.
#[derive(Clone)]
pub struct EncryptionProvider {
    primary: Option<Arc<dyn Encryptor>>,
}

impl EncryptionProvider {
    /// Provider that tries `primary` first.
    #[must_use]
    pub fn new(primary: Arc<dyn Encryptor>) -> Self {
        Self {
            primary: Some(primary),
        }
    }

    /// Provider with no primary: every field gets the digest fallback.
    #[must_use]
    pub const fn fallback_only() -> Self {
        Self { primary: None }
    }

    /// Provider from an optional primary, as returned by `TransitClient::from_env`.
    #[must_use]
    pub fn from_optional(primary: Option<Arc<dyn Encryptor>>) -> Self {
        Self { primary }
    }

    /// Whether the primary is configured and reports itself available.
    #[must_use]
    pub fn primary_available(&self) -> bool {
        self.primary.as_ref().is_some_and(|p| p.available())
    }

    /// Encrypts `plaintext` under `key_name`, degrading to the digest fallback.
    ///
    /// `field` only labels log lines.
    pub async fn protect(&self, field: &str, key_name: &str, plaintext: &str) -> Ciphertext {
        let reason = match &self.primary {
            Some(primary) if primary.available() => {
                match primary.encrypt(key_name, plaintext).await {
                    Ok(ciphertext) => return ciphertext,
                    Err(e) => {
                        tracing::warn!(
                            field,
                            provider = primary.name(),
                            error = %e,
                            "Encryption failed, using fallback digest"
                        );
                        FallbackReason::Failed
                    }
                }
            }
            Some(primary) => {
                tracing::debug!(field, provider = primary.name(), "Encryption provider unavailable");
                FallbackReason::Unavailable
            }
            None => FallbackReason::Unavailable,
        };

        metrics::counter!("encryption_fallbacks_total", "reason" => reason.as_str()).increment(1);
        digest(plaintext)
    }
}

impl std::fmt::Debug for EncryptionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionProvider")
            .field("primary", &self.primary.as_ref().map(|p| p.name()))
            .finish()
    }
}
