//! ECC secure channel handshake.
//!
//! Each party signs its certificate and an ephemeral ECDH public key, the peer
//! verifies that signature against the certificate's key, and both sides
//! derive per-direction session keys from the ECDH secret.

#![forbid(unsafe_code)]

pub mod error;
pub mod curve;
pub mod bignum;
pub mod hash;
pub mod utils;

pub mod keys;
pub mod certificate;
pub mod engine;

pub mod salt;
pub mod kdf;
pub mod message;
pub mod session;

pub mod config;
pub mod store;

pub use certificate::{extract_public_key, Certificate, CertificatePublicKey};
pub use config::{ConfigError, HandshakeConfig};
pub use curve::NamedCurve;
pub use engine::{KeyAgreementEngine, RustCryptoEngine, SignatureEngine};
pub use error::{HandshakeError, Result};
pub use kdf::DerivedKeySet;
pub use keys::{EcPoint, EphemeralKeyPair, Nonce, PrivateSigningKey, SharedSecret};
pub use session::{
    derive_session_keys, EstablishedSecret, FailureReason, FailureStage, HandshakeSession,
    HandshakeState, Role, SessionKeys,
};
pub use store::{CertificateStore, DirectoryStore, MemoryStore, StoreError};

#[cfg(test)]
mod proptests;
