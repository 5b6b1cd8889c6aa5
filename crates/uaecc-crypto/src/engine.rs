//! Signature and key agreement capabilities.
//!
//! The handshake core only talks to these traits, so a different backend
//! (hardware token, reference implementation in a test harness) can be
//! plugged in without touching message or session logic.
//!
//! [`RustCryptoEngine`] is the default software backend, with arithmetic for
//! P-256 (`p256`) and brainpoolP256r1 (`bp256`).

use tracing::trace;

use crate::certificate::CertificatePublicKey;
use crate::curve::NamedCurve;
use crate::error::{HandshakeError, Result};
use crate::keys::{EcPoint, EphemeralKeyPair, PrivateSigningKey, SharedSecret};

/// ECDSA with SHA-256 over certificate-bound keys.
pub trait SignatureEngine {
    /// Sign `message` (hashed with SHA-256 by the engine). Returns the fixed
    /// `r || s` encoding of `curve.signature_len()` bytes.
    fn sign(&self, key: &PrivateSigningKey, message: &[u8]) -> Result<Vec<u8>>;

    /// Verify a fixed-size `r || s` signature over `message`.
    fn verify(&self, key: &CertificatePublicKey, message: &[u8], signature: &[u8]) -> Result<()>;
}

/// Ephemeral ECDH.
pub trait KeyAgreementEngine {
    /// Generate a fresh key pair on `curve`.
    fn generate_ephemeral(&self, curve: NamedCurve) -> Result<EphemeralKeyPair>;

    /// Rebuild a key pair from a known private scalar.
    fn ephemeral_from_scalar(&self, curve: NamedCurve, scalar: &[u8]) -> Result<EphemeralKeyPair>;

    /// Combine `own` with `peer`. The key pair is consumed; its scalar is
    /// wiped when this returns, whatever the outcome.
    fn agree(&self, own: EphemeralKeyPair, peer: &EcPoint) -> Result<SharedSecret>;
}

/// ECDSA and ECDH primitives for one RustCrypto curve type.
macro_rules! curve_backend {
    ($module:ident, $curve:ty, $named:expr) => {
        mod $module {
            use ecdsa::signature::{Signer, Verifier};
            use elliptic_curve::sec1::ToSec1Point;
            use elliptic_curve::Generate;
            use zeroize::Zeroizing;

            use crate::curve::NamedCurve;
            use crate::error::{HandshakeError, Result};
            use crate::keys::{EcPoint, EphemeralKeyPair, SharedSecret};

            type SecretKey = elliptic_curve::SecretKey<$curve>;
            type PublicKey = elliptic_curve::PublicKey<$curve>;
            type SigningKey = ecdsa::SigningKey<$curve>;
            type VerifyingKey = ecdsa::VerifyingKey<$curve>;
            type Signature = ecdsa::Signature<$curve>;

            const CURVE: NamedCurve = $named;

            pub(super) fn sign(scalar: &[u8], message: &[u8]) -> Result<Vec<u8>> {
                let signing_key = SigningKey::from_slice(scalar)
                    .map_err(|e| HandshakeError::InvalidPrivateKey(e.to_string()))?;
                let signature: Signature = signing_key.sign(message);
                Ok(signature.to_bytes().to_vec())
            }

            pub(super) fn verify(uncompressed: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
                let verifying_key = VerifyingKey::from_sec1_bytes(uncompressed)
                    .map_err(|_| HandshakeError::InvalidPublicKey)?;
                let signature =
                    Signature::from_slice(signature).map_err(|_| HandshakeError::SignatureInvalid)?;
                verifying_key
                    .verify(message, &signature)
                    .map_err(|_| HandshakeError::SignatureInvalid)
            }

            pub(super) fn generate() -> EphemeralKeyPair {
                pair(SecretKey::generate())
            }

            pub(super) fn from_scalar(scalar: &[u8]) -> Result<EphemeralKeyPair> {
                let secret = SecretKey::from_slice(scalar)
                    .map_err(|e| HandshakeError::InvalidPrivateKey(e.to_string()))?;
                Ok(pair(secret))
            }

            pub(super) fn agree(scalar: &[u8], peer: &EcPoint) -> Result<SharedSecret> {
                let peer_public = PublicKey::from_sec1_bytes(&peer.to_uncompressed())
                    .map_err(|_| HandshakeError::InvalidPublicKey)?;
                let secret = SecretKey::from_slice(scalar)
                    .map_err(|e| HandshakeError::InvalidPrivateKey(e.to_string()))?;
                let shared = elliptic_curve::ecdh::diffie_hellman(
                    secret.to_nonzero_scalar(),
                    peer_public.as_affine(),
                );
                Ok(SharedSecret::new(shared.raw_secret_bytes().to_vec()))
            }

            fn pair(secret: SecretKey) -> EphemeralKeyPair {
                let encoded = secret.public_key().to_sec1_point(false);
                // Uncompressed: 0x04 || X || Y
                let xy = &encoded.as_bytes()[1..];
                let (x, y) = xy.split_at(xy.len() / 2);
                let public = EcPoint {
                    curve: CURVE,
                    x: x.to_vec(),
                    y: y.to_vec(),
                };
                let scalar = Zeroizing::new(secret.to_bytes());
                EphemeralKeyPair::from_parts(CURVE, Zeroizing::new(scalar.to_vec()), public)
            }
        }
    };
}

curve_backend!(nist_p256, p256::NistP256, NamedCurve::P256);
curve_backend!(brainpool_p256r1, bp256::r1::BrainpoolP256r1, NamedCurve::BrainpoolP256r1);

/// Software backend built on the RustCrypto curve crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoEngine;

impl RustCryptoEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SignatureEngine for RustCryptoEngine {
    fn sign(&self, key: &PrivateSigningKey, message: &[u8]) -> Result<Vec<u8>> {
        match key.curve() {
            NamedCurve::P256 => nist_p256::sign(key.scalar_bytes(), message),
            NamedCurve::BrainpoolP256r1 => brainpool_p256r1::sign(key.scalar_bytes(), message),
        }
    }

    fn verify(&self, key: &CertificatePublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
        let uncompressed = key.to_uncompressed();
        match key.curve {
            NamedCurve::P256 => nist_p256::verify(&uncompressed, message, signature),
            NamedCurve::BrainpoolP256r1 => {
                brainpool_p256r1::verify(&uncompressed, message, signature)
            }
        }
    }
}

impl KeyAgreementEngine for RustCryptoEngine {
    fn generate_ephemeral(&self, curve: NamedCurve) -> Result<EphemeralKeyPair> {
        Ok(match curve {
            NamedCurve::P256 => nist_p256::generate(),
            NamedCurve::BrainpoolP256r1 => brainpool_p256r1::generate(),
        })
    }

    fn ephemeral_from_scalar(&self, curve: NamedCurve, scalar: &[u8]) -> Result<EphemeralKeyPair> {
        match curve {
            NamedCurve::P256 => nist_p256::from_scalar(scalar),
            NamedCurve::BrainpoolP256r1 => brainpool_p256r1::from_scalar(scalar),
        }
    }

    fn agree(&self, own: EphemeralKeyPair, peer: &EcPoint) -> Result<SharedSecret> {
        if own.curve() != peer.curve {
            return Err(HandshakeError::KeyMismatch {
                key: peer.curve,
                certificate: own.curve(),
            });
        }
        let shared = match own.curve() {
            NamedCurve::P256 => nist_p256::agree(own.private_scalar(), peer),
            NamedCurve::BrainpoolP256r1 => brainpool_p256r1::agree(own.private_scalar(), peer),
        };
        drop(own);
        trace!(curve = %peer.curve, "ecdh agreement complete");
        shared
    }
}
