//! Certificate loading and public key extraction.
//!
//! Only the key-usage extension is consulted. No chain building or validity
//! period checks happen here.

use std::fmt;

use x509_cert::der::{Decode, Encode};
use x509_cert::ext::pkix::KeyUsage;

use crate::curve::{NamedCurve, EC_PUBLIC_KEY_OID};
use crate::error::{HandshakeError, Result};

/// `id-ce-keyUsage`
const KEY_USAGE_OID: x509_cert::der::asn1::ObjectIdentifier =
    x509_cert::der::asn1::ObjectIdentifier::new_unwrap("2.5.29.15");

/// A DER-encoded X.509 certificate.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    parsed: x509_cert::Certificate,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let parsed = x509_cert::Certificate::from_der(der)
            .map_err(|e| HandshakeError::InvalidCertificate(e.to_string()))?;
        Ok(Self {
            der: der.to_vec(),
            parsed,
        })
    }

    /// The exact bytes this certificate was loaded from.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> String {
        self.parsed.tbs_certificate.subject.to_string()
    }

    pub fn x509(&self) -> &x509_cert::Certificate {
        &self.parsed
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .field("der_len", &self.der.len())
            .finish()
    }
}

/// The EC public key a certificate binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePublicKey {
    pub curve: NamedCurve,
    pub x: Vec<u8>,
    pub y: Vec<u8>,
}

impl CertificatePublicKey {
    pub fn to_uncompressed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.x.len() + self.y.len());
        out.push(0x04);
        out.extend_from_slice(&self.x);
        out.extend_from_slice(&self.y);
        out
    }

    pub fn signature_len(&self) -> usize {
        self.curve.signature_len()
    }
}

/// True when any usage this exchange relies on is granted.
fn key_usage_sufficient(ku: &KeyUsage) -> bool {
    ku.key_agreement()
        || ku.digital_signature()
        || ku.non_repudiation()
        || ku.crl_sign()
        || ku.key_cert_sign()
}

/// Extract the EC public point and its named curve from `certificate`.
pub fn extract_public_key(certificate: &Certificate) -> Result<CertificatePublicKey> {
    let tbs = &certificate.parsed.tbs_certificate;
    let spki = &tbs.subject_public_key_info;

    if spki.algorithm.oid != EC_PUBLIC_KEY_OID {
        return Err(HandshakeError::UnsupportedKeyAlgorithm {
            oid: spki.algorithm.oid.to_string(),
        });
    }

    for ext in tbs.extensions.iter().flatten() {
        if ext.extn_id == KEY_USAGE_OID {
            let ku = KeyUsage::from_der(ext.extn_value.as_bytes())
                .map_err(|e| HandshakeError::InvalidCertificate(format!("key usage: {e}")))?;
            if !key_usage_sufficient(&ku) {
                return Err(HandshakeError::InsufficientKeyUsage);
            }
        }
    }

    let key_value = spki.subject_public_key.raw_bytes();
    match key_value.first() {
        Some(0x04) => {}
        _ => return Err(HandshakeError::UnsupportedPointFormat),
    }
    let xy = &key_value[1..];
    if xy.is_empty() || xy.len() % 2 != 0 {
        return Err(HandshakeError::UnsupportedPointFormat);
    }
    let (x, y) = xy.split_at(xy.len() / 2);

    let params = spki
        .algorithm
        .parameters
        .as_ref()
        .ok_or_else(|| HandshakeError::UnknownCurve("missing curve parameters".to_string()))?;
    let encoded = params
        .to_der()
        .map_err(|e| HandshakeError::InvalidCertificate(e.to_string()))?;
    let curve_oid = x509_cert::der::asn1::ObjectIdentifier::from_der(&encoded)
        .map_err(|_| HandshakeError::UnknownCurve(hex::encode_upper(&encoded)))?;
    let curve = NamedCurve::from_oid(&curve_oid)?;

    Ok(CertificatePublicKey {
        curve,
        x: x.to_vec(),
        y: y.to_vec(),
    })
}
