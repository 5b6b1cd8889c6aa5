
#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use proptest::prelude::*;
    use rcgen::{CertificateParams, KeyPair, KeyUsagePurpose, PKCS_ECDSA_P256_SHA256};

    use crate::bignum::{from_bytes, from_hex, to_hex};
    use crate::certificate::Certificate;
    use crate::curve::NamedCurve;
    use crate::engine::{KeyAgreementEngine, RustCryptoEngine};
    use crate::error::HandshakeError;
    use crate::kdf::derive;
    use crate::keys::PrivateSigningKey;
    use crate::message::{decode, encode};
    use crate::salt::{build_salt, CLIENT_LABEL, SERVER_LABEL};

    struct Fixture {
        bytes: Vec<u8>,
        cert_len: usize,
    }

    // Minting and signing once keeps the per-case cost at one decode.
    fn fixture() -> &'static Fixture {
        static FIXTURE: OnceLock<Fixture> = OnceLock::new();
        FIXTURE.get_or_init(|| {
            let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
            let mut params = CertificateParams::new(vec!["charlie.test".to_string()]).unwrap();
            params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
            let cert = params.self_signed(&key_pair).unwrap();
            let cert = Certificate::from_der(cert.der()).unwrap();
            let key = PrivateSigningKey::from_pkcs8_der(&key_pair.serialize_der()).unwrap();

            let engine = RustCryptoEngine::new();
            let eph = engine.generate_ephemeral(NamedCurve::P256).unwrap();
            let msg = encode(&engine, &cert, &key, eph.public()).unwrap();
            Fixture {
                bytes: msg.bytes,
                cert_len: cert.as_der().len(),
            }
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_kdf_prefix_stability(
            secret in proptest::collection::vec(any::<u8>(), 1..64),
            salt in proptest::collection::vec(any::<u8>(), 0..160),
            m in 0usize..200,
            extra in 0usize..100,
        ) {
            let short = derive(&secret, &salt, m).unwrap();
            let long = derive(&secret, &salt, m + extra).unwrap();
            prop_assert_eq!(short.len(), m);
            prop_assert_eq!(&long[..m], short.as_slice());
        }

        #[test]
        fn test_salt_direction_asymmetry(
            n1 in proptest::collection::vec(any::<u8>(), 1..80),
            n2 in proptest::collection::vec(any::<u8>(), 1..80),
        ) {
            let client = build_salt(Some(CLIENT_LABEL), Some(&n1), Some(&n2));
            let server = build_salt(Some(SERVER_LABEL), Some(&n2), Some(&n1));
            prop_assert_ne!(client, server);
        }

        #[test]
        fn test_bignum_hex_round_trip(bytes in proptest::collection::vec(any::<u8>(), 1..48)) {
            let value = from_bytes(&bytes, 0, None).unwrap();
            let again = from_hex(Some(&to_hex(&bytes))).unwrap();
            prop_assert_eq!(value, again);
        }

        #[test]
        fn test_message_bit_flip_rejected(index in any::<prop::sample::Index>(), bit in 0u8..8) {
            let fixture = fixture();
            let engine = RustCryptoEngine::new();
            let mut bytes = fixture.bytes.clone();
            let at = index.index(bytes.len());
            bytes[at] ^= 1 << bit;

            let result = decode(&engine, &bytes);
            prop_assert!(result.is_err());

            // Past the certificate everything is covered by the signature
            // before it is interpreted.
            let ephemeral_start = 8 + fixture.cert_len;
            if at >= ephemeral_start {
                prop_assert_eq!(result.unwrap_err(), HandshakeError::SignatureInvalid);
            }
        }
    }
}
