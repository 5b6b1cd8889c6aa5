//! Certificate and private key lookup by name.
//!
//! A directory store follows the usual `pki/` layout:
//!
//! ```text
//! pki/
//!   certs/<name>.der      DER X.509 certificate
//!   private/<name>.pem    PKCS#8 "PRIVATE KEY" or SEC1 "EC PRIVATE KEY"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::certificate::Certificate;
use crate::error::HandshakeError;
use crate::keys::PrivateSigningKey;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during store lookups.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{name}: {source}")]
    Invalid {
        name: String,
        #[source]
        source: HandshakeError,
    },
}

/// Source of named certificates and their signing keys.
pub trait CertificateStore {
    fn certificate(&self, name: &str) -> Result<Certificate, StoreError>;

    fn private_key(&self, name: &str) -> Result<PrivateSigningKey, StoreError>;

    /// Certificate and key together.
    fn identity(&self, name: &str) -> Result<(Certificate, PrivateSigningKey), StoreError> {
        Ok((self.certificate(name)?, self.private_key(name)?))
    }
}

// ============================================================================
// Directory Store
// ============================================================================

#[derive(Debug, Clone)]
pub struct DirectoryStore {
    certs_dir: PathBuf,
    private_dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(certs_dir: impl Into<PathBuf>, private_dir: impl Into<PathBuf>) -> Self {
        Self {
            certs_dir: certs_dir.into(),
            private_dir: private_dir.into(),
        }
    }

    /// `<root>/certs` and `<root>/private`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(root.join("certs"), root.join("private"))
    }

    pub fn certificate_path(&self, name: &str) -> PathBuf {
        self.certs_dir.join(format!("{name}.der"))
    }

    pub fn private_key_path(&self, name: &str) -> PathBuf {
        self.private_dir.join(format!("{name}.pem"))
    }

    fn read(path: &Path, name: &str) -> Result<Vec<u8>, StoreError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(format!("{name} ({})", path.display())))
            }
            Err(source) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl CertificateStore for DirectoryStore {
    fn certificate(&self, name: &str) -> Result<Certificate, StoreError> {
        let path = self.certificate_path(name);
        debug!(path = %path.display(), "loading certificate");
        let der = Self::read(&path, name)?;
        Certificate::from_der(&der).map_err(|source| StoreError::Invalid {
            name: name.to_string(),
            source,
        })
    }

    fn private_key(&self, name: &str) -> Result<PrivateSigningKey, StoreError> {
        let path = self.private_key_path(name);
        debug!(path = %path.display(), "loading private key");
        let bytes = zeroize::Zeroizing::new(Self::read(&path, name)?);
        let invalid = |source| StoreError::Invalid {
            name: name.to_string(),
            source,
        };
        let pem = std::str::from_utf8(&bytes)
            .map_err(|_| invalid(HandshakeError::InvalidPrivateKey("key file is not PEM".to_string())))?;
        PrivateSigningKey::from_pem(pem).map_err(invalid)
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-memory store, mainly for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    certificates: HashMap<String, Certificate>,
    keys: HashMap<String, PrivateSigningKey>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, certificate: Certificate, key: PrivateSigningKey) {
        let name = name.into();
        self.certificates.insert(name.clone(), certificate);
        self.keys.insert(name, key);
    }

    pub fn insert_certificate(&mut self, name: impl Into<String>, certificate: Certificate) {
        self.certificates.insert(name.into(), certificate);
    }
}

impl CertificateStore for MemoryStore {
    fn certificate(&self, name: &str) -> Result<Certificate, StoreError> {
        self.certificates
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn private_key(&self, name: &str) -> Result<PrivateSigningKey, StoreError> {
        self.keys
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::NamedCurve;
    use rcgen::{CertificateParams, KeyPair, PKCS_ECDSA_P256_SHA256};

    fn minted() -> (Vec<u8>, KeyPair) {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
        let params = CertificateParams::new(vec!["charlie.test".to_string()]).unwrap();
        let cert = params.self_signed(&key_pair).unwrap();
        (cert.der().to_vec(), key_pair)
    }

    #[test]
    fn test_directory_store_loads_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::from_root(dir.path());
        std::fs::create_dir_all(dir.path().join("certs")).unwrap();
        std::fs::create_dir_all(dir.path().join("private")).unwrap();

        let (der, key_pair) = minted();
        std::fs::write(store.certificate_path("Charlie"), &der).unwrap();
        std::fs::write(store.private_key_path("Charlie"), key_pair.serialize_pem()).unwrap();

        let (cert, key) = store.identity("Charlie").unwrap();
        assert_eq!(cert.as_der(), der.as_slice());
        assert_eq!(key.curve(), NamedCurve::P256);
    }

    #[test]
    fn test_directory_store_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::from_root(dir.path());
        assert!(matches!(
            store.certificate("Nobody"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.private_key("Nobody"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_directory_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path(), dir.path());
        std::fs::write(store.certificate_path("Bad"), b"not a certificate").unwrap();
        std::fs::write(store.private_key_path("Bad"), b"not a key").unwrap();

        assert!(matches!(
            store.certificate("Bad"),
            Err(StoreError::Invalid { source: HandshakeError::InvalidCertificate(_), .. })
        ));
        assert!(matches!(
            store.private_key("Bad"),
            Err(StoreError::Invalid { source: HandshakeError::InvalidPrivateKey(_), .. })
        ));
    }

    #[test]
    fn test_memory_store() {
        let (der, key_pair) = minted();
        let mut store = MemoryStore::new();
        store.insert(
            "Diana",
            Certificate::from_der(&der).unwrap(),
            PrivateSigningKey::from_pkcs8_der(&key_pair.serialize_der()).unwrap(),
        );

        assert!(store.identity("Diana").is_ok());
        assert!(matches!(store.certificate("Derek"), Err(StoreError::NotFound(_))));

        store.insert_certificate("Derek", Certificate::from_der(&der).unwrap());
        assert!(store.certificate("Derek").is_ok());
        assert!(matches!(store.private_key("Derek"), Err(StoreError::NotFound(_))));
    }
}
