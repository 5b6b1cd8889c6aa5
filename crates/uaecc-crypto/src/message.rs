//! Signed handshake message codec.
//!
//! Wire layout, all integers little-endian `u32`:
//!
//! ```text
//! totalLength | certLen | cert | ephemeralKeySize | ephemeralXY | signature
//! ```
//!
//! `totalLength` counts every byte including the signature. The signature
//! length is not transmitted; it follows from the certificate key size
//! (`key_bits / 4`, the fixed `r || s` encoding). The peer ephemeral key is
//! taken to be on the certificate's curve: both parties must be configured
//! for the same curve, a mismatch is not detected here.

use bytes::{BufMut, BytesMut};
use tracing::{trace, warn};

use crate::bignum::to_hex;
use crate::certificate::{extract_public_key, Certificate, CertificatePublicKey};
use crate::curve::NamedCurve;
use crate::engine::SignatureEngine;
use crate::error::{HandshakeError, Result};
use crate::hash::{fingerprint, sha256};
use crate::keys::{EcPoint, Nonce, PrivateSigningKey};

const LEN_FIELD: usize = 4;

/// An encoded message and the nonce it contributes to key derivation.
#[derive(Debug, Clone)]
pub struct EncodedMessage {
    pub bytes: Vec<u8>,
    pub nonce: Nonce,
}

/// The authenticated content of a received message.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    pub certificate: Certificate,
    pub sender_key: CertificatePublicKey,
    pub peer_public: EcPoint,
    pub nonce: Nonce,
}

/// Non-secret description of a message, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub total_length: usize,
    pub certificate_subject: String,
    pub certificate_length: usize,
    pub certificate_fingerprint: String,
    pub curve: NamedCurve,
    pub ephemeral_key_length: usize,
    pub signature_length: usize,
    pub nonce_hex: String,
}

fn read_len(data: &[u8], offset: usize, field: &str) -> Result<usize> {
    let bytes = offset
        .checked_add(LEN_FIELD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| HandshakeError::malformed(format!("{field} runs past end of message")))?;
    let mut raw = [0u8; LEN_FIELD];
    raw.copy_from_slice(bytes);
    Ok(u32::from_le_bytes(raw) as usize)
}

fn to_len_field(len: usize, field: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| HandshakeError::malformed(format!("{field} does not fit in u32")))
}

/// Build and sign a handshake message carrying `ephemeral_public`.
///
/// The fresh signature is verified against the certificate's own key before
/// the message is returned, so a signing key that does not belong to the
/// certificate fails here with [`HandshakeError::SignatureSelfCheckFailed`].
pub fn encode<S: SignatureEngine + ?Sized>(
    engine: &S,
    certificate: &Certificate,
    signing_key: &PrivateSigningKey,
    ephemeral_public: &EcPoint,
) -> Result<EncodedMessage> {
    let cert_key = extract_public_key(certificate)?;
    if signing_key.curve() != cert_key.curve {
        return Err(HandshakeError::KeyMismatch {
            key: signing_key.curve(),
            certificate: cert_key.curve,
        });
    }

    let cert_der = certificate.as_der();
    let ephemeral_xy = ephemeral_public.to_xy();
    let signature_len = cert_key.signature_len();
    let total_len = LEN_FIELD * 3 + cert_der.len() + ephemeral_xy.len() + signature_len;

    let mut buf = BytesMut::with_capacity(total_len);
    buf.put_u32_le(to_len_field(total_len, "totalLength")?);
    buf.put_u32_le(to_len_field(cert_der.len(), "certLen")?);
    buf.extend_from_slice(cert_der);
    buf.put_u32_le(to_len_field(ephemeral_xy.len(), "ephemeralKeySize")?);
    buf.extend_from_slice(&ephemeral_xy);

    trace!(hash = %to_hex(&sha256(&buf)), "signing handshake message");
    let signature = engine.sign(signing_key, &buf)?;
    if signature.len() != signature_len {
        return Err(HandshakeError::SignatureSelfCheckFailed);
    }
    engine
        .verify(&cert_key, &buf, &signature)
        .map_err(|_| HandshakeError::SignatureSelfCheckFailed)?;
    buf.extend_from_slice(&signature);

    trace!(
        total_len,
        cert = %fingerprint(cert_der),
        nonce = %to_hex(&ephemeral_xy),
        "encoded handshake message"
    );

    Ok(EncodedMessage {
        bytes: buf.to_vec(),
        nonce: Nonce::new(ephemeral_xy),
    })
}

/// Parse `data`, authenticate it against the embedded certificate and
/// return the sender's ephemeral key.
///
/// Bytes past `totalLength` are ignored.
pub fn decode<S: SignatureEngine + ?Sized>(engine: &S, data: &[u8]) -> Result<DecodedMessage> {
    let total_len = read_len(data, 0, "totalLength")?;
    let message = data
        .get(..total_len)
        .ok_or_else(|| HandshakeError::malformed("totalLength exceeds buffer"))?;

    let cert_len = read_len(message, LEN_FIELD, "certLen")?;
    let cert_start = LEN_FIELD * 2;
    let cert_end = cert_start
        .checked_add(cert_len)
        .filter(|&end| end <= message.len())
        .ok_or_else(|| HandshakeError::malformed("certificate runs past end of message"))?;

    let certificate = Certificate::from_der(&message[cert_start..cert_end])?;
    let sender_key = extract_public_key(&certificate)?;

    let signed_len = total_len
        .checked_sub(sender_key.signature_len())
        .filter(|&len| len >= cert_end)
        .ok_or_else(|| HandshakeError::malformed("no room for signature"))?;
    let (signed, signature) = message.split_at(signed_len);

    trace!(hash = %to_hex(&sha256(signed)), "verifying handshake message");
    engine
        .verify(&sender_key, signed, signature)
        .map_err(|e| match e {
            // A certificate key that cannot verify anything authenticates nothing.
            HandshakeError::InvalidPublicKey => HandshakeError::SignatureInvalid,
            other => other,
        })
        .inspect_err(|e| {
            if *e == HandshakeError::SignatureInvalid {
                warn!(cert = %fingerprint(certificate.as_der()), "received signature not valid");
            }
        })?;

    let key_len = read_len(signed, cert_end, "ephemeralKeySize")?;
    let key_start = cert_end + LEN_FIELD;
    let key_end = key_start
        .checked_add(key_len)
        .filter(|&end| end <= signed_len)
        .ok_or_else(|| HandshakeError::malformed("ephemeral key runs into signature"))?;
    let ephemeral_xy = &signed[key_start..key_end];
    let peer_public = EcPoint::from_xy(sender_key.curve, ephemeral_xy)?;

    trace!(
        total_len,
        cert = %fingerprint(certificate.as_der()),
        nonce = %to_hex(ephemeral_xy),
        "decoded handshake message"
    );

    Ok(DecodedMessage {
        certificate,
        sender_key,
        peer_public,
        nonce: Nonce::new(ephemeral_xy.to_vec()),
    })
}

/// Decode `data` and describe it without exposing anything secret.
pub fn inspect<S: SignatureEngine + ?Sized>(engine: &S, data: &[u8]) -> Result<MessageSummary> {
    let decoded = decode(engine, data)?;
    let total_length = read_len(data, 0, "totalLength")?;
    Ok(MessageSummary {
        total_length,
        certificate_subject: decoded.certificate.subject(),
        certificate_length: decoded.certificate.as_der().len(),
        certificate_fingerprint: fingerprint(decoded.certificate.as_der()),
        curve: decoded.sender_key.curve,
        ephemeral_key_length: decoded.nonce.len(),
        signature_length: decoded.sender_key.signature_len(),
        nonce_hex: to_hex(decoded.nonce.as_bytes()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{KeyAgreementEngine, RustCryptoEngine};
    use rcgen::{CertificateParams, KeyPair, KeyUsagePurpose, PKCS_ECDSA_P256_SHA256};

    fn identity() -> (Certificate, PrivateSigningKey) {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
        let mut params = CertificateParams::new(vec!["diana.test".to_string()]).unwrap();
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature, KeyUsagePurpose::KeyAgreement];
        let cert = params.self_signed(&key_pair).unwrap();
        (
            Certificate::from_der(cert.der()).unwrap(),
            PrivateSigningKey::from_pkcs8_der(&key_pair.serialize_der()).unwrap(),
        )
    }

    fn encoded() -> (EncodedMessage, EcPoint, Certificate) {
        let engine = RustCryptoEngine::new();
        let (cert, key) = identity();
        let eph = engine.generate_ephemeral(NamedCurve::P256).unwrap();
        let msg = encode(&engine, &cert, &key, eph.public()).unwrap();
        (msg, eph.public().clone(), cert)
    }

    #[test]
    fn test_layout() {
        let (msg, eph, cert) = encoded();
        let bytes = &msg.bytes;
        let cert_len = cert.as_der().len();

        assert_eq!(read_len(bytes, 0, "t").unwrap(), bytes.len());
        assert_eq!(read_len(bytes, 4, "c").unwrap(), cert_len);
        assert_eq!(&bytes[8..8 + cert_len], cert.as_der());
        assert_eq!(read_len(bytes, 8 + cert_len, "k").unwrap(), 64);
        assert_eq!(&bytes[12 + cert_len..12 + cert_len + 64], eph.to_xy().as_slice());
        assert_eq!(bytes.len(), 12 + cert_len + 64 + 64);
        assert_eq!(msg.nonce.as_bytes(), eph.to_xy().as_slice());
    }

    #[test]
    fn test_round_trip() {
        let engine = RustCryptoEngine::new();
        let (msg, eph, cert) = encoded();
        let decoded = decode(&engine, &msg.bytes).unwrap();
        assert_eq!(decoded.peer_public, eph);
        assert_eq!(decoded.certificate, cert);
        assert_eq!(decoded.nonce, msg.nonce);
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let engine = RustCryptoEngine::new();
        let (msg, eph, _) = encoded();
        let mut padded = msg.bytes.clone();
        padded.extend_from_slice(&[0xEE; 16]);
        assert_eq!(decode(&engine, &padded).unwrap().peer_public, eph);
    }

    #[test]
    fn test_signature_tamper_rejected() {
        let engine = RustCryptoEngine::new();
        let (msg, _, _) = encoded();
        let mut bytes = msg.bytes.clone();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert_eq!(decode(&engine, &bytes).unwrap_err(), HandshakeError::SignatureInvalid);
    }

    #[test]
    fn test_ephemeral_tamper_rejected() {
        let engine = RustCryptoEngine::new();
        let (msg, _, cert) = encoded();
        let mut bytes = msg.bytes.clone();
        bytes[12 + cert.as_der().len() + 5] ^= 0x80;
        assert_eq!(decode(&engine, &bytes).unwrap_err(), HandshakeError::SignatureInvalid);
    }

    #[test]
    fn test_key_size_field_tamper_rejected() {
        let engine = RustCryptoEngine::new();
        let (msg, _, cert) = encoded();
        let mut bytes = msg.bytes.clone();
        bytes[8 + cert.as_der().len()] ^= 0x02;
        assert_eq!(decode(&engine, &bytes).unwrap_err(), HandshakeError::SignatureInvalid);
    }

    #[test]
    fn test_truncated_rejected() {
        let engine = RustCryptoEngine::new();
        let (msg, _, _) = encoded();
        assert!(matches!(
            decode(&engine, &msg.bytes[..msg.bytes.len() - 1]),
            Err(HandshakeError::MalformedMessage(_))
        ));
        assert!(matches!(
            decode(&engine, &msg.bytes[..3]),
            Err(HandshakeError::MalformedMessage(_))
        ));
        assert!(matches!(decode(&engine, &[]), Err(HandshakeError::MalformedMessage(_))));
    }

    #[test]
    fn test_cert_length_overrun_rejected() {
        let engine = RustCryptoEngine::new();
        let (msg, _, _) = encoded();
        let mut bytes = msg.bytes.clone();
        bytes[4..8].copy_from_slice(&(u32::MAX).to_le_bytes());
        assert!(matches!(
            decode(&engine, &bytes),
            Err(HandshakeError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_wrong_signing_key_fails_self_check() {
        let engine = RustCryptoEngine::new();
        let (cert, _) = identity();
        let (_, other_key) = identity();
        let eph = engine.generate_ephemeral(NamedCurve::P256).unwrap();
        assert_eq!(
            encode(&engine, &cert, &other_key, eph.public()).unwrap_err(),
            HandshakeError::SignatureSelfCheckFailed
        );
    }

    #[test]
    fn test_inspect() {
        let engine = RustCryptoEngine::new();
        let (msg, eph, cert) = encoded();
        let summary = inspect(&engine, &msg.bytes).unwrap();
        assert_eq!(summary.total_length, msg.bytes.len());
        assert_eq!(summary.certificate_length, cert.as_der().len());
        assert_eq!(summary.curve, NamedCurve::P256);
        assert_eq!(summary.ephemeral_key_length, 64);
        assert_eq!(summary.signature_length, 64);
        assert_eq!(summary.nonce_hex, to_hex(&eph.to_xy()));
    }
}
