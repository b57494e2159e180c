//! Scriptable encryptor.

use shopfloor_core::encryption::{EncryptFuture, Encryptor};
use shopfloor_core::error::EncryptionError;
use shopfloor_core::purchase::Ciphertext;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// [`Encryptor`] whose availability and failures are set by the test.
///
/// Successful calls return `scripted:v1:<n>` where `n` counts calls, so output never
/// contains the plaintext.
#[derive(Clone, Debug)]
pub struct ScriptedEncryptor {
    available: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl Default for ScriptedEncryptor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEncryptor {
    /// Available and succeeding
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: Arc::new(AtomicBool::new(true)),
            failing: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set what `available()` reports
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make `encrypt` fail until called again with `false`
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `encrypt` calls so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Encryptor for ScriptedEncryptor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn encrypt<'a>(&'a self, _key_name: &'a str, _plaintext: &'a str) -> EncryptFuture<'a> {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.failing.load(Ordering::SeqCst) {
                return Err(EncryptionError::Provider("scripted failure".to_string()));
            }
            Ok(Ciphertext::new(format!("scripted:v1:{n}")))
        })
    }
}
