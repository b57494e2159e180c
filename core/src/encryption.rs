//! Encryption capability.
//!
//! Two variants exist: the secret-engine client, which produces reversible
//! ciphertext, and a keyless digest fallback, which only guarantees that plaintext
//! is never written. The choice between them is made per field by
//! `EncryptionProvider` in `shopfloor-vault`, never by callers.

use crate::error::EncryptionError;
use crate::purchase::Ciphertext;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`Encryptor::encrypt`].
pub type EncryptFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Ciphertext, EncryptionError>> + Send + 'a>>;

/// Something that can turn a sensitive value into a storable one.
pub trait Encryptor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether the provider is configured and worth trying.
    fn available(&self) -> bool;

    /// Encrypts `plaintext` under the named key.
    ///
    /// # Errors
    ///
    /// Returns `EncryptionError` if the provider is unavailable or the operation
    /// failed.
    fn encrypt<'a>(&'a self, key_name: &'a str, plaintext: &'a str) -> EncryptFuture<'a>;
}
