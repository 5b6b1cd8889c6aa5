//! Handshake error types.
//!
//! Every variant is terminal for the handshake attempt that raised it.
//! Messages name the failing stage and never carry key material.

use thiserror::Error;

use crate::curve::NamedCurve;

/// Errors raised by the handshake modules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("certificate key algorithm is not elliptic-curve: {oid}")]
    UnsupportedKeyAlgorithm { oid: String },

    #[error("certificate key usage does not allow signing or key agreement")]
    InsufficientKeyUsage,

    #[error("unsupported point format: only uncompressed points are supported")]
    UnsupportedPointFormat,

    #[error("unknown curve: {0}")]
    UnknownCurve(String),

    #[error("received signature not valid")]
    SignatureInvalid,

    #[error("generated signature not valid")]
    SignatureSelfCheckFailed,

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("curve {0} has no arithmetic backend")]
    CurveNotSupported(NamedCurve),

    #[error("signing key curve {key} does not match certificate curve {certificate}")]
    KeyMismatch {
        key: NamedCurve,
        certificate: NamedCurve,
    },

    #[error("requested {requested} bytes of key material, at most {max} available")]
    KdfOutputTooLong { requested: usize, max: usize },

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("handshake configuration rejected: {0}")]
    InvalidConfig(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl HandshakeError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        HandshakeError::MalformedMessage(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, HandshakeError>;
