//! Vault Transit client implementation

use crate::error::VaultError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shopfloor_core::encryption::{EncryptFuture, Encryptor};
use shopfloor_core::purchase::Ciphertext;
use std::time::Duration;

/// Default Transit mount path
pub const DEFAULT_MOUNT: &str = "transit";

/// Default Transit key name
pub const DEFAULT_KEY_NAME: &str = "shopfloor-key";

/// Connection settings for the Transit engine.
#[derive(Clone)]
pub struct VaultConfig {
    /// Vault address, e.g. `http://127.0.0.1:8200`
    pub addr: String,
    /// Token sent as `X-Vault-Token`
    pub token: String,
    /// Mount path of the Transit engine
    pub mount: String,
    /// Key used for purchase fields
    pub key_name: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("addr", &self.addr)
            .field("token", &"<redacted>")
            .field("mount", &self.mount)
            .field("key_name", &self.key_name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl VaultConfig {
    /// Config for `addr` with default mount, key and a 5 second timeout.
    #[must_use]
    pub fn new(addr: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            token: token.into(),
            mount: DEFAULT_MOUNT.to_string(),
            key_name: DEFAULT_KEY_NAME.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Reads `VAULT_ADDR`, `VAULT_TOKEN`, `VAULT_TRANSIT_MOUNT`, `VAULT_KEY_NAME` and
    /// `VAULT_TIMEOUT` (seconds).
    ///
    /// Returns `None` when `VAULT_ADDR` is unset or empty: the secret engine is then
    /// considered not configured.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let addr = lookup("VAULT_ADDR").filter(|a| !a.trim().is_empty())?;
        let mut config = Self::new(addr, lookup("VAULT_TOKEN").unwrap_or_default());

        if let Some(mount) = lookup("VAULT_TRANSIT_MOUNT") {
            config.mount = mount;
        }
        if let Some(key_name) = lookup("VAULT_KEY_NAME") {
            config.key_name = key_name;
        }
        if let Some(raw) = lookup("VAULT_TIMEOUT") {
            match raw.parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %raw, "Invalid VAULT_TIMEOUT, using default"),
            }
        }

        Some(config)
    }
}

#[derive(Serialize)]
struct EncryptRequest {
    plaintext: String,
}

#[derive(Serialize)]
struct DecryptRequest<'a> {
    ciphertext: &'a str,
}

#[derive(Deserialize)]
struct SecretResponse<T> {
    data: T,
}

#[derive(Deserialize)]
struct EncryptData {
    ciphertext: String,
}

#[derive(Deserialize)]
struct DecryptData {
    plaintext: String,
}

/// Vault Transit client
#[derive(Clone)]
pub struct TransitClient {
    client: Client,
    config: VaultConfig,
}

impl TransitClient {
    /// Create a client for the given configuration
    ///
    /// # Errors
    ///
    /// Returns `VaultError::InvalidConfig` if the HTTP client cannot be built
    pub fn new(config: VaultConfig) -> Result<Self, VaultError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VaultError::InvalidConfig(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create a client from the environment, or `None` if Vault is not configured
    ///
    /// # Errors
    ///
    /// Returns `VaultError::InvalidConfig` if the HTTP client cannot be built
    pub fn from_env() -> Result<Option<Self>, VaultError> {
        VaultConfig::from_env().map(Self::new).transpose()
    }

    /// Configuration this client was built with
    #[must_use]
    pub const fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Encrypts `plaintext` under `key_name` and returns Vault's ciphertext
    /// (`vault:v<N>:…`).
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, Vault errors, or parsing failures
    pub async fn encrypt_data(&self, key_name: &str, plaintext: &str) -> Result<String, VaultError> {
        let body = EncryptRequest {
            plaintext: STANDARD.encode(plaintext.as_bytes()),
        };
        let response: SecretResponse<EncryptData> = self.write("encrypt", key_name, &body).await?;
        Ok(response.data.ciphertext)
    }

    /// Decrypts Transit ciphertext produced under `key_name`.
    ///
    /// Fallback digests are not ciphertext and are rejected by Vault.
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, Vault errors, parsing failures, or a
    /// payload that is not base64-encoded UTF-8
    pub async fn decrypt_data(&self, key_name: &str, ciphertext: &str) -> Result<String, VaultError> {
        let body = DecryptRequest { ciphertext };
        let response: SecretResponse<DecryptData> = self.write("decrypt", key_name, &body).await?;

        let bytes = STANDARD
            .decode(response.data.plaintext)
            .map_err(|e| VaultError::Decode(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| VaultError::Decode(e.to_string()))
    }

    async fn write<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        operation: &str,
        key_name: &str,
        body: &B,
    ) -> Result<T, VaultError> {
        let url = format!(
            "{}/v1/{}/{operation}/{key_name}",
            self.config.addr.trim_end_matches('/'),
            self.config.mount
        );

        let response = self
            .client
            .post(url)
            .header("X-Vault-Token", &self.config.token)
            .json(body)
            .send()
            .await
            .map_err(|e| VaultError::RequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<T>()
                .await
                .map_err(|e| VaultError::ResponseParseFailed(e.to_string())),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Err(VaultError::PermissionDenied),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(VaultError::ApiError {
                    status: status.as_u16(),
                    message: body,
                })
            }
        }
    }
}

impl Encryptor for TransitClient {
    fn name(&self) -> &'static str {
        "vault-transit"
    }

    fn available(&self) -> bool {
        !self.config.addr.is_empty()
    }

    fn encrypt<'a>(&'a self, key_name: &'a str, plaintext: &'a str) -> EncryptFuture<'a> {
        Box::pin(async move {
            let ciphertext = self.encrypt_data(key_name, plaintext).await?;
            Ok(Ciphertext::new(ciphertext))
        })
    }
}
