//! Transit client tests against a mock Vault server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use shopfloor_core::encryption::Encryptor;
use shopfloor_vault::{EncryptionProvider, TransitClient, VaultConfig, VaultError, is_fallback};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> TransitClient {
    let mut config = VaultConfig::new(server.uri(), "test-token");
    config.timeout = Duration::from_millis(500);
    TransitClient::new(config).unwrap()
}

#[tokio::test]
async fn encrypt_posts_base64_plaintext() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/transit/encrypt/shopfloor-key"))
        .and(header("X-Vault-Token", "test-token"))
        .and(body_json(serde_json::json!({"plaintext": "NTU1LTAxMDA="})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"ciphertext": "vault:v1:abc123", "key_version": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ciphertext = client.encrypt("shopfloor-key", "555-0100").await.unwrap();
    assert_eq!(ciphertext.as_str(), "vault:v1:abc123");
}

#[tokio::test]
async fn decrypt_returns_plaintext() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/transit/decrypt/shopfloor-key"))
        .and(body_json(serde_json::json!({"ciphertext": "vault:v1:abc123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"plaintext": "NTU1LTAxMDA="}
        })))
        .mount(&server)
        .await;

    let plaintext = client_for(&server)
        .decrypt_data("shopfloor-key", "vault:v1:abc123")
        .await
        .unwrap();
    assert_eq!(plaintext, "555-0100");
}

#[tokio::test]
async fn forbidden_is_permission_denied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "errors": ["permission denied"]
        })))
        .mount(&server)
        .await;

    let result = client_for(&server).encrypt_data("shopfloor-key", "x").await;
    assert!(matches!(result, Err(VaultError::PermissionDenied)));
}

#[tokio::test]
async fn server_error_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("sealed"))
        .mount(&server)
        .await;

    let result = client_for(&server).encrypt_data("shopfloor-key", "x").await;
    match result {
        Err(VaultError::ApiError { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "sealed");
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn custom_mount_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/secure/encrypt/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"ciphertext": "vault:v2:zz"}
        })))
        .mount(&server)
        .await;

    let mut config = VaultConfig::new(server.uri(), "t");
    config.mount = "secure".to_string();
    let client = TransitClient::new(config).unwrap();
    assert_eq!(client.encrypt_data("orders", "x").await.unwrap(), "vault:v2:zz");
}

#[tokio::test]
async fn provider_falls_back_when_vault_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = EncryptionProvider::new(Arc::new(client_for(&server)));
    let stored = provider.protect("card", "shopfloor-key", "4242424242424242").await;
    assert!(is_fallback(&stored));
}

#[tokio::test]
async fn provider_falls_back_when_vault_unreachable() {
    // Dropped server: either nothing listens or no mock matches
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let mut config = VaultConfig::new(uri, "t");
    config.timeout = Duration::from_millis(200);
    let provider = EncryptionProvider::new(Arc::new(TransitClient::new(config).unwrap()));

    let stored = provider.protect("phone", "shopfloor-key", "555-0100").await;
    assert!(is_fallback(&stored));
}
