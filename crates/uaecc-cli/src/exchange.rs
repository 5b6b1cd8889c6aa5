//! Two-party exchange through files.
//!
//! Both sides run in one process. The client writes its request to the
//! work directory, the server reads it back from disk and writes its
//! response, and the client finishes from the response file. Only the
//! message bytes cross between the two sessions.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use uaecc_crypto::bignum::to_hex;
use uaecc_crypto::salt::{client_salt, server_salt};
use uaecc_crypto::{
    CertificateStore, DerivedKeySet, EstablishedSecret, HandshakeError, HandshakeSession,
    NamedCurve, Role, RustCryptoEngine, StoreError,
};

use crate::config::Config;
use crate::ExitCode;

/// Exchange errors
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Certificate store: {0}")]
    Store(#[from] StoreError),

    #[error("{role} handshake failed: {source}")]
    Handshake {
        role: Role,
        #[source]
        source: HandshakeError,
    },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExchangeError {
    fn handshake(role: Role) -> impl FnOnce(HandshakeError) -> Self {
        move |source| ExchangeError::Handshake { role, source }
    }

    /// Exit code reported for this failure.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ExchangeError::Store(StoreError::NotFound(_)) => ExitCode::NotFound,
            ExchangeError::Store(StoreError::Invalid { source, .. }) => {
                ExitCode::for_handshake_error(source)
            }
            ExchangeError::Store(StoreError::Io { .. }) => ExitCode::GeneralError,
            ExchangeError::Handshake { source, .. } => ExitCode::for_handshake_error(source),
            ExchangeError::Io { .. } => ExitCode::GeneralError,
        }
    }
}

/// One direction's key set as upper-case hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySetHex {
    pub signing_key: String,
    pub encrypting_key: String,
    pub initialization_vector: String,
    /// Key material past the IV; empty at the default length.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub additional_material: String,
}

impl From<&DerivedKeySet> for KeySetHex {
    fn from(keys: &DerivedKeySet) -> Self {
        Self {
            signing_key: to_hex(&keys.signing_key),
            encrypting_key: to_hex(&keys.encrypting_key),
            initialization_vector: to_hex(&keys.initialization_vector),
            additional_material: to_hex(&keys.additional_material),
        }
    }
}

/// Diagnostics for a completed exchange.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeReport {
    pub curve: NamedCurve,
    pub client: String,
    pub server: String,
    pub request_file: PathBuf,
    pub request_bytes: usize,
    pub response_file: PathBuf,
    pub response_bytes: usize,
    pub client_nonce: String,
    pub server_nonce: String,
    pub client_salt: String,
    pub server_salt: String,
    pub client_secret: String,
    pub server_secret: String,
    pub secrets_match: bool,
    pub client_keys: KeySetHex,
    pub server_keys: KeySetHex,
    pub keys_match: bool,
}

impl ExchangeReport {
    /// Both sides hold the same secret and the same key sets.
    pub fn is_consistent(&self) -> bool {
        self.secrets_match && self.keys_match
    }
}

/// Run a full exchange between the configured client and server identities.
pub fn run_exchange<S: CertificateStore>(
    store: &S,
    config: &Config,
) -> Result<ExchangeReport, ExchangeError> {
    let curve = config.handshake.curve;
    let client_name = config.pki.client_name(curve);
    let server_name = config.pki.server_name(curve);
    info!(%curve, client = %client_name, server = %server_name, "starting exchange");

    let (client_cert, client_key) = store.identity(&client_name)?;
    let (server_cert, server_key) = store.identity(&server_name)?;

    let engine = RustCryptoEngine::new();
    let mut client =
        HandshakeSession::client(engine, config.handshake.clone(), client_cert, client_key)
            .map_err(ExchangeError::handshake(Role::Client))?;
    let mut server =
        HandshakeSession::server(engine, config.handshake.clone(), server_cert, server_key)
            .map_err(ExchangeError::handshake(Role::Server))?;

    std::fs::create_dir_all(&config.exchange.work_dir).map_err(|source| ExchangeError::Io {
        path: config.exchange.work_dir.clone(),
        source,
    })?;
    let request_path = config.exchange.request_path();
    let response_path = config.exchange.response_path();

    let request = client
        .create_request()
        .map_err(ExchangeError::handshake(Role::Client))?;
    write_message(&request_path, &request)?;

    let received_request = read_message(&request_path)?;
    let response = server
        .respond_to_request(&received_request)
        .map_err(ExchangeError::handshake(Role::Server))?;
    write_message(&response_path, &response)?;

    let received_response = read_message(&response_path)?;
    client
        .finish_with_response(&received_response)
        .map_err(ExchangeError::handshake(Role::Client))?;

    let (Some(client_side), Some(server_side)) = (client.established(), server.established())
    else {
        let source = HandshakeError::InvalidState("exchange finished without a secret".into());
        return Err(ExchangeError::Handshake {
            role: Role::Client,
            source,
        });
    };

    let report = build_report(
        curve,
        client_name,
        server_name,
        (request_path, request.len()),
        (response_path, response.len()),
        client_side,
        server_side,
    );
    debug!(
        secrets_match = report.secrets_match,
        keys_match = report.keys_match,
        "exchange complete"
    );
    Ok(report)
}

fn build_report(
    curve: NamedCurve,
    client: String,
    server: String,
    (request_file, request_bytes): (PathBuf, usize),
    (response_file, response_bytes): (PathBuf, usize),
    client_side: &EstablishedSecret,
    server_side: &EstablishedSecret,
) -> ExchangeReport {
    let client_nonce = client_side.client_nonce.as_bytes();
    let server_nonce = client_side.server_nonce.as_bytes();

    ExchangeReport {
        curve,
        client,
        server,
        request_file,
        request_bytes,
        response_file,
        response_bytes,
        client_nonce: to_hex(client_nonce),
        server_nonce: to_hex(server_nonce),
        client_salt: to_hex(&client_salt(client_nonce, server_nonce)),
        server_salt: to_hex(&server_salt(client_nonce, server_nonce)),
        client_secret: to_hex(client_side.shared_secret.as_bytes()),
        server_secret: to_hex(server_side.shared_secret.as_bytes()),
        secrets_match: client_side.shared_secret == server_side.shared_secret,
        client_keys: KeySetHex::from(&client_side.keys.client),
        server_keys: KeySetHex::from(&client_side.keys.server),
        keys_match: client_side.keys == server_side.keys
            && client_side.client_nonce == server_side.client_nonce
            && client_side.server_nonce == server_side.server_nonce,
    }
}

fn write_message(path: &Path, bytes: &[u8]) -> Result<(), ExchangeError> {
    debug!(path = %path.display(), len = bytes.len(), "writing message");
    std::fs::write(path, bytes).map_err(|source| ExchangeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_message(path: &Path) -> Result<Vec<u8>, ExchangeError> {
    std::fs::read(path).map_err(|source| ExchangeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, KeyPair, KeyUsagePurpose, PKCS_ECDSA_P256_SHA256};
    use tempfile::TempDir;
    use uaecc_crypto::{Certificate, DirectoryStore, MemoryStore, PrivateSigningKey};

    fn mint(name: &str, usages: Vec<KeyUsagePurpose>) -> (Certificate, PrivateSigningKey) {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
        let mut params = CertificateParams::new(vec![format!("{name}.test")]).unwrap();
        params.key_usages = usages;
        let cert = params.self_signed(&key_pair).unwrap();
        (
            Certificate::from_der(cert.der()).unwrap(),
            PrivateSigningKey::from_pkcs8_der(&key_pair.serialize_der()).unwrap(),
        )
    }

    fn store_with(server_usages: Vec<KeyUsagePurpose>) -> MemoryStore {
        let mut store = MemoryStore::new();
        let (cert, key) = mint("charlie", vec![KeyUsagePurpose::DigitalSignature]);
        store.insert("Charlie", cert, key);
        let (cert, key) = mint("diana", server_usages);
        store.insert("Diana", cert, key);
        store
    }

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.exchange.work_dir = dir.to_path_buf();
        config
    }

    #[test]
    fn test_exchange_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = store_with(vec![KeyUsagePurpose::KeyAgreement]);
        let config = config_in(temp.path());

        let report = run_exchange(&store, &config).unwrap();

        assert!(report.is_consistent());
        assert_eq!(report.client, "Charlie");
        assert_eq!(report.server, "Diana");
        assert_eq!(report.client_secret, report.server_secret);
        assert_ne!(report.client_keys, report.server_keys);
        assert!(report.client_salt.starts_with(&to_hex(b"opcua-client")));
        assert!(report.server_salt.starts_with(&to_hex(b"opcua-server")));
        assert_eq!(report.client_keys.signing_key.len(), 64);
        assert_eq!(report.client_keys.initialization_vector.len(), 32);
        assert!(report.client_keys.additional_material.is_empty());

        let request = std::fs::read(config.exchange.request_path()).unwrap();
        assert_eq!(request.len(), report.request_bytes);
        let response = std::fs::read(config.exchange.response_path()).unwrap();
        assert_eq!(response.len(), report.response_bytes);
    }

    #[test]
    fn test_exchange_reports_additional_material() {
        let temp = TempDir::new().unwrap();
        let store = store_with(vec![KeyUsagePurpose::KeyAgreement]);
        let mut config = config_in(temp.path());
        config.handshake.key_material_length = 96;

        let report = run_exchange(&store, &config).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.client_keys.additional_material.len(), 32);
        assert_eq!(report.server_keys.additional_material.len(), 32);
        assert_ne!(
            report.client_keys.additional_material,
            report.server_keys.additional_material
        );
    }

    #[test]
    fn test_exchange_missing_identity() {
        let temp = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let err = run_exchange(&store, &config_in(temp.path())).unwrap_err();
        assert!(matches!(err, ExchangeError::Store(StoreError::NotFound(_))));
        assert_eq!(err.exit_code(), ExitCode::NotFound);
    }

    #[test]
    fn test_exchange_rejects_server_key_usage() {
        let temp = TempDir::new().unwrap();
        let store = store_with(vec![KeyUsagePurpose::KeyEncipherment]);
        let err = run_exchange(&store, &config_in(temp.path())).unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Handshake {
                role: Role::Server,
                source: HandshakeError::InsufficientKeyUsage
            }
        ));
        assert_eq!(err.exit_code(), ExitCode::AuthenticationFailed);
    }

    #[test]
    fn test_exchange_certificate_curve_mismatch() {
        let temp = TempDir::new().unwrap();
        let store = store_with(vec![KeyUsagePurpose::DigitalSignature]);
        let mut config = config_in(temp.path());
        config.handshake.curve = NamedCurve::BrainpoolP256r1;
        config.pki.client_certificate = Some("Charlie".to_string());
        config.pki.server_certificate = Some("Diana".to_string());

        // P-256 certificates do not match a brainpool configuration.
        let err = run_exchange(&store, &config).unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Handshake {
                role: Role::Client,
                source: HandshakeError::KeyMismatch { .. }
            }
        ));
    }

    #[test]
    fn test_exchange_brainpool_directory_store() {
        let temp = TempDir::new().unwrap();
        let pki = temp.path().join("pki");
        std::fs::create_dir_all(pki.join("certs")).unwrap();
        std::fs::create_dir_all(pki.join("private")).unwrap();
        let fixtures = [
            ("certs/Cindy.der", &include_bytes!("../../uaecc-crypto/tests/fixtures/cindy.der")[..]),
            ("certs/Derek.der", &include_bytes!("../../uaecc-crypto/tests/fixtures/derek.der")[..]),
            ("private/Cindy.pem", include_str!("../../uaecc-crypto/tests/fixtures/cindy.pem").as_bytes()),
            ("private/Derek.pem", include_str!("../../uaecc-crypto/tests/fixtures/derek.pem").as_bytes()),
        ];
        for (name, bytes) in fixtures {
            std::fs::write(pki.join(name), bytes).unwrap();
        }

        let mut config = config_in(temp.path());
        config.handshake.curve = NamedCurve::BrainpoolP256r1;
        config.pki.root = pki.clone();
        let store = DirectoryStore::from_root(&pki);

        let report = run_exchange(&store, &config).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.client, "Cindy");
        assert_eq!(report.server, "Derek");
        assert_eq!(report.curve, NamedCurve::BrainpoolP256r1);
        assert_eq!(report.client_nonce.len(), 128);
    }
}
