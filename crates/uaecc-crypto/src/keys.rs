//! Key material types.
//!
//! Private scalars and agreement output live in zeroizing storage. None of
//! these types print their secret bytes through `Debug`.

use std::fmt;

use pkcs8::der::Decode;
use pkcs8::{PrivateKeyInfo, SecretDocument};
use sec1::EcPrivateKey;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::curve::{NamedCurve, EC_PUBLIC_KEY_OID};
use crate::error::{HandshakeError, Result};
use crate::utils::constant_time_compare;

/// An affine point given as big-endian X and Y coordinates.
#[derive(Clone, PartialEq, Eq)]
pub struct EcPoint {
    pub curve: NamedCurve,
    pub x: Vec<u8>,
    pub y: Vec<u8>,
}

impl EcPoint {
    /// Split `X || Y` evenly into its coordinates.
    pub fn from_xy(curve: NamedCurve, xy: &[u8]) -> Result<Self> {
        if xy.is_empty() || xy.len() % 2 != 0 {
            return Err(HandshakeError::malformed("point length is not an even number of bytes"));
        }
        let (x, y) = xy.split_at(xy.len() / 2);
        Ok(Self {
            curve,
            x: x.to_vec(),
            y: y.to_vec(),
        })
    }

    /// `X || Y`, the form carried on the wire.
    pub fn to_xy(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.x.len() + self.y.len());
        out.extend_from_slice(&self.x);
        out.extend_from_slice(&self.y);
        out
    }

    /// SEC1 uncompressed encoding: `0x04 || X || Y`.
    pub fn to_uncompressed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.x.len() + self.y.len());
        out.push(0x04);
        out.extend_from_slice(&self.x);
        out.extend_from_slice(&self.y);
        out
    }
}

impl fmt::Debug for EcPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcPoint")
            .field("curve", &self.curve)
            .field("x", &hex::encode(&self.x))
            .field("y", &hex::encode(&self.y))
            .finish()
    }
}

/// Public salt material taken from an ephemeral public key.
#[derive(Clone, PartialEq, Eq)]
pub struct Nonce(Vec<u8>);

impl Nonce {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", hex::encode_upper(&self.0))
    }
}

impl AsRef<[u8]> for Nonce {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Raw ECDH output (the X coordinate of the combined point).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        constant_time_compare(&self.0, &other.0)
    }
}

impl Eq for SharedSecret {}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret([REDACTED; {}])", self.0.len())
    }
}

/// Certificate-bound signing key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateSigningKey {
    #[zeroize(skip)]
    curve: NamedCurve,
    scalar: Vec<u8>,
}

impl PrivateSigningKey {
    pub fn new(curve: NamedCurve, scalar: Vec<u8>) -> Result<Self> {
        if scalar.len() != curve.field_size() {
            return Err(HandshakeError::InvalidPrivateKey(format!(
                "expected {} scalar bytes, got {}",
                curve.field_size(),
                scalar.len()
            )));
        }
        Ok(Self { curve, scalar })
    }

    /// Load a PKCS#8 `PrivateKeyInfo` holding an EC key.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = PrivateKeyInfo::try_from(der)
            .map_err(|e| HandshakeError::InvalidPrivateKey(e.to_string()))?;
        if info.algorithm.oid != EC_PUBLIC_KEY_OID {
            return Err(HandshakeError::UnsupportedKeyAlgorithm {
                oid: info.algorithm.oid.to_string(),
            });
        }
        let outer_curve = info
            .algorithm
            .parameters_oid()
            .ok()
            .map(|oid| NamedCurve::from_oid(&oid))
            .transpose()?;
        Self::from_ec_private_key(info.private_key, outer_curve)
    }

    /// Load a SEC1 `ECPrivateKey`.
    pub fn from_sec1_der(der: &[u8]) -> Result<Self> {
        Self::from_ec_private_key(der, None)
    }

    /// Load a PEM key: `PRIVATE KEY` (PKCS#8) or `EC PRIVATE KEY` (SEC1).
    pub fn from_pem(pem: &str) -> Result<Self> {
        let (label, doc) = SecretDocument::from_pem(pem)
            .map_err(|e| HandshakeError::InvalidPrivateKey(e.to_string()))?;
        match label {
            "PRIVATE KEY" => Self::from_pkcs8_der(doc.as_bytes()),
            "EC PRIVATE KEY" => Self::from_sec1_der(doc.as_bytes()),
            other => Err(HandshakeError::InvalidPrivateKey(format!(
                "unexpected PEM label {other:?}"
            ))),
        }
    }

    fn from_ec_private_key(der: &[u8], outer_curve: Option<NamedCurve>) -> Result<Self> {
        let ec = EcPrivateKey::from_der(der)
            .map_err(|e| HandshakeError::InvalidPrivateKey(e.to_string()))?;
        let inner_curve = ec
            .parameters
            .and_then(|p| p.named_curve())
            .map(|oid| NamedCurve::from_oid(&oid))
            .transpose()?;
        let curve = outer_curve.or(inner_curve).ok_or_else(|| {
            HandshakeError::InvalidPrivateKey("key does not name its curve".to_string())
        })?;
        Self::new(curve, ec.private_key.to_vec())
    }

    pub fn curve(&self) -> NamedCurve {
        self.curve
    }

    pub fn scalar_bytes(&self) -> &[u8] {
        &self.scalar
    }
}

impl fmt::Debug for PrivateSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateSigningKey")
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}

/// Per-handshake ECDH key pair.
///
/// Not `Clone`: a key pair is moved into exactly one agreement and its
/// scalar is wiped when it is dropped.
pub struct EphemeralKeyPair {
    curve: NamedCurve,
    private: Zeroizing<Vec<u8>>,
    public: EcPoint,
}

impl EphemeralKeyPair {
    /// Assemble a key pair from parts produced by a key agreement engine.
    pub fn from_parts(curve: NamedCurve, private: Zeroizing<Vec<u8>>, public: EcPoint) -> Self {
        Self {
            curve,
            private,
            public,
        }
    }

    pub fn curve(&self) -> NamedCurve {
        self.curve
    }

    pub fn public(&self) -> &EcPoint {
        &self.public
    }

    pub fn private_scalar(&self) -> &[u8] {
        &self.private
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("curve", &self.curve)
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}
