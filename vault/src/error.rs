//! Error types for the Vault client

use shopfloor_core::error::EncryptionError;
use thiserror::Error;

/// Errors that can occur when talking to Vault
#[derive(Debug, Error)]
pub enum VaultError {
    /// Client could not be built from the given configuration
    #[error("Invalid Vault configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Token missing, expired or lacking policy for the path
    #[error("Permission denied")]
    PermissionDenied,

    /// Vault returned an error
    #[error("Vault error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error body from Vault
        message: String,
    },

    /// Decrypted payload was not valid base64 UTF-8
    #[error("Decode failed: {0}")]
    Decode(String),
}

impl From<VaultError> for EncryptionError {
    fn from(error: VaultError) -> Self {
        Self::Provider(error.to_string())
    }
}
