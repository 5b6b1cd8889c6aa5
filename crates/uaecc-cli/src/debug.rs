//! Debug and diagnostic tools
//!
//! This module provides offline diagnostics for handshake artifacts:
//! - Message inspection (decode and verify a request or response file)
//! - Salt and session key recomputation from a known secret and nonces
//! - Raw KDF output for arbitrary secret, salt and length

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use uaecc_crypto::bignum::to_hex;
use uaecc_crypto::kdf::derive;
use uaecc_crypto::message::{inspect, MessageSummary};
use uaecc_crypto::salt::{client_salt, server_salt};
use uaecc_crypto::{derive_session_keys, HandshakeError, RustCryptoEngine, SharedSecret};

use crate::exchange::KeySetHex;

/// Debug operation errors
#[derive(Debug, Error)]
pub enum DebugError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decoded message information
#[derive(Debug, Clone, Serialize)]
pub struct MessageInfo {
    /// `totalLength` field, including the signature
    pub total_length: usize,
    /// Certificate subject name
    pub certificate_subject: String,
    /// Certificate size in bytes
    pub certificate_length: usize,
    /// First 8 bytes of SHA-256 over the certificate (hex)
    pub certificate_fingerprint: String,
    /// Curve named by the certificate
    pub curve: String,
    /// Ephemeral key size in bytes
    pub ephemeral_key_length: usize,
    /// Signature size in bytes
    pub signature_length: usize,
    /// Sender nonce (hex)
    pub nonce: String,
    /// Always true: messages failing verification are not described
    pub signature_valid: bool,
}

impl From<MessageSummary> for MessageInfo {
    fn from(summary: MessageSummary) -> Self {
        Self {
            total_length: summary.total_length,
            certificate_subject: summary.certificate_subject,
            certificate_length: summary.certificate_length,
            certificate_fingerprint: summary.certificate_fingerprint,
            curve: summary.curve.to_string(),
            ephemeral_key_length: summary.ephemeral_key_length,
            signature_length: summary.signature_length,
            nonce: summary.nonce_hex,
            signature_valid: true,
        }
    }
}

/// Recomputed salts and key sets for both directions
#[derive(Debug, Clone, Serialize)]
pub struct DerivedKeysInfo {
    pub client_salt: String,
    pub server_salt: String,
    pub client_keys: KeySetHex,
    pub server_keys: KeySetHex,
}

/// Debugging and diagnostic utilities
pub struct DebugTools {
    engine: RustCryptoEngine,
}

impl DebugTools {
    /// Create new debug tools
    pub fn new() -> Self {
        Self {
            engine: RustCryptoEngine::new(),
        }
    }

    /// Decode, verify and describe an encoded message file
    pub fn inspect_file(&self, path: &Path) -> Result<MessageInfo, DebugError> {
        let bytes = std::fs::read(path)?;
        self.inspect_bytes(&bytes)
    }

    /// Decode, verify and describe an encoded message
    pub fn inspect_bytes(&self, bytes: &[u8]) -> Result<MessageInfo, DebugError> {
        Ok(inspect(&self.engine, bytes)?.into())
    }

    /// Recompute both directions' salts and key sets from hex inputs
    pub fn derive_keys_from_hex(
        &self,
        secret_hex: &str,
        client_nonce_hex: &str,
        server_nonce_hex: &str,
    ) -> Result<DerivedKeysInfo, DebugError> {
        let secret = SharedSecret::new(parse_hex("secret", secret_hex)?);
        let client_nonce = parse_hex("client nonce", client_nonce_hex)?;
        let server_nonce = parse_hex("server nonce", server_nonce_hex)?;

        let keys = derive_session_keys(&secret, &client_nonce, &server_nonce)?;
        Ok(DerivedKeysInfo {
            client_salt: to_hex(&client_salt(&client_nonce, &server_nonce)),
            server_salt: to_hex(&server_salt(&client_nonce, &server_nonce)),
            client_keys: KeySetHex::from(&keys.client),
            server_keys: KeySetHex::from(&keys.server),
        })
    }

    /// Raw KDF output as upper-case hex
    pub fn kdf_from_hex(
        &self,
        secret_hex: &str,
        salt_hex: &str,
        length: usize,
    ) -> Result<String, DebugError> {
        let secret = parse_hex("secret", secret_hex)?;
        let salt = parse_hex("salt", salt_hex)?;
        let output = derive(&secret, &salt, length)?;
        Ok(to_hex(&output))
    }
}

impl Default for DebugTools {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse hex, tolerating whitespace and `-`/`:` separators.
pub fn parse_hex(what: &str, input: &str) -> Result<Vec<u8>, DebugError> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != ':')
        .collect();
    if cleaned.is_empty() {
        return Err(DebugError::InvalidInput(format!("{what} is empty")));
    }
    hex::decode(&cleaned).map_err(|e| DebugError::InvalidInput(format!("Invalid {what} hex: {e}")))
}
