//! Keyless digest fallback.
//!
//! Produces `fallback:v1:` followed by the base64 SHA-256 of the input. The output is
//! deterministic and one-way: it keeps plaintext out of storage when no secret engine
//! is reachable, and cannot be decrypted later.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use shopfloor_core::encryption::{EncryptFuture, Encryptor};
use shopfloor_core::purchase::Ciphertext;

/// Version tag that marks fallback output.
pub const FALLBACK_TAG: &str = "fallback:v1:";

/// Digest of `plaintext` in the fallback format.
#[must_use]
pub fn digest(plaintext: &str) -> Ciphertext {
    let hash = Sha256::digest(plaintext.as_bytes());
    Ciphertext::new(format!("{FALLBACK_TAG}{}", STANDARD.encode(hash)))
}

/// Whether a stored value was produced by the fallback.
#[must_use]
pub fn is_fallback(value: &Ciphertext) -> bool {
    value.as_str().starts_with(FALLBACK_TAG)
}

/// [`Encryptor`] that always succeeds with [`digest`]. The key name is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestEncryptor;

impl Encryptor for DigestEncryptor {
    fn name(&self) -> &'static str {
        "digest"
    }

    fn available(&self) -> bool {
        true
    }

    fn encrypt<'a>(&'a self, _key_name: &'a str, plaintext: &'a str) -> EncryptFuture<'a> {
        Box::pin(async move { Ok(digest(plaintext)) })
    }
}
