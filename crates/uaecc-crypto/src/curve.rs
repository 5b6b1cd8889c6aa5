//! Named curve table.
//!
//! Certificates name their curve through the algorithm parameters OID. The
//! same table resolves configuration names, so a deployment picks its curve
//! at runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use x509_cert::der::asn1::ObjectIdentifier;

use crate::error::HandshakeError;

/// `id-ecPublicKey`
pub const EC_PUBLIC_KEY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// `prime256v1` / `secp256r1`
pub const P256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");

/// `brainpoolP256r1`
pub const BRAINPOOL_P256R1_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.36.3.3.2.8.1.1.7");

/// Curves a certificate may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NamedCurve {
    P256,
    BrainpoolP256r1,
}

impl NamedCurve {
    pub const ALL: [NamedCurve; 2] = [NamedCurve::P256, NamedCurve::BrainpoolP256r1];

    pub fn oid(self) -> ObjectIdentifier {
        match self {
            NamedCurve::P256 => P256_OID,
            NamedCurve::BrainpoolP256r1 => BRAINPOOL_P256R1_OID,
        }
    }

    /// Look up the curve named by an algorithm parameters OID.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, HandshakeError> {
        Self::ALL
            .into_iter()
            .find(|c| c.oid() == *oid)
            .ok_or_else(|| HandshakeError::UnknownCurve(oid.to_string()))
    }

    pub fn name(self) -> &'static str {
        match self {
            NamedCurve::P256 => "P-256",
            NamedCurve::BrainpoolP256r1 => "brainpoolP256r1",
        }
    }

    pub fn key_size_bits(self) -> usize {
        256
    }

    /// Size of one coordinate in bytes.
    pub fn field_size(self) -> usize {
        self.key_size_bits() / 8
    }

    /// Fixed-size `r || s` ECDSA signature length.
    pub fn signature_len(self) -> usize {
        self.key_size_bits() / 4
    }
}

impl fmt::Display for NamedCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NamedCurve {
    type Err = HandshakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "P-256" | "p256" | "nistP256" | "prime256v1" | "secp256r1" => Ok(NamedCurve::P256),
            "brainpoolP256r1" | "bp256r1" => Ok(NamedCurve::BrainpoolP256r1),
            other => Err(HandshakeError::UnknownCurve(other.to_string())),
        }
    }
}

impl TryFrom<String> for NamedCurve {
    type Error = HandshakeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NamedCurve> for String {
    fn from(c: NamedCurve) -> Self {
        c.name().to_string()
    }
}
