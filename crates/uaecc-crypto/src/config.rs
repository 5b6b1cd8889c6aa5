//! Handshake configuration.
//!
//! ```toml
//! curve = "P-256"              # "P-256" | "nistP256" | "prime256v1" | "brainpoolP256r1"
//! key_material_length = 80
//! ```
//!
//! Both parties must be configured with the same curve. The wire format does
//! not carry it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::curve::NamedCurve;
use crate::kdf::{KEY_SET_LEN, MAX_OUTPUT_LEN};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown curve: {0}")]
    UnknownCurve(String),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHandshakeConfig")]
pub struct HandshakeConfig {
    /// Curve for certificates and ephemeral keys.
    pub curve: NamedCurve,

    /// Bytes derived per direction. The first 80 form the key set.
    pub key_material_length: usize,
}

#[derive(Deserialize)]
struct RawHandshakeConfig {
    #[serde(default = "default_curve")]
    curve: String,

    #[serde(default = "default_key_material_length")]
    key_material_length: usize,
}

fn default_curve() -> String {
    NamedCurve::P256.name().to_string()
}

fn default_key_material_length() -> usize {
    KEY_SET_LEN
}

impl TryFrom<RawHandshakeConfig> for HandshakeConfig {
    type Error = ConfigError;

    fn try_from(raw: RawHandshakeConfig) -> Result<Self, Self::Error> {
        let curve = raw
            .curve
            .parse::<NamedCurve>()
            .map_err(|_| ConfigError::UnknownCurve(raw.curve.clone()))?;
        let config = Self {
            curve,
            key_material_length: raw.key_material_length,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            curve: NamedCurve::P256,
            key_material_length: default_key_material_length(),
        }
    }
}

impl HandshakeConfig {
    pub fn new(curve: NamedCurve) -> Self {
        Self {
            curve,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_material_length < KEY_SET_LEN {
            return Err(ConfigError::Validation(format!(
                "key_material_length must be at least {KEY_SET_LEN}, got {}",
                self.key_material_length
            )));
        }
        if self.key_material_length > MAX_OUTPUT_LEN {
            return Err(ConfigError::Validation(format!(
                "key_material_length must be at most {MAX_OUTPUT_LEN}, got {}",
                self.key_material_length
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawHandshakeConfig = toml::from_str(content)?;
        Self::try_from(raw)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
