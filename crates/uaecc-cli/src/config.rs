//! Configuration management for uaecc
//!
//! This module handles loading, saving, and validating configuration for the
//! uaecc CLI. Configuration is stored in TOML format.
//!
//! # Configuration File Locations
//!
//! - Unix: `~/.config/uaecc/uaecc.toml`
//! - Windows: `%APPDATA%\opcfoundation\uaecc\config\uaecc.toml`
//!
//! The handshake curve is chosen here at runtime. Unknown curve names are
//! rejected when the file is loaded.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use uaecc_crypto::{HandshakeConfig, NamedCurve};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Handshake section rejected
    #[error("Invalid handshake configuration: {0}")]
    Handshake(#[from] uaecc_crypto::ConfigError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// CLI configuration
///
/// # Example TOML
///
/// ```toml
/// [handshake]
/// curve = "P-256"  # "P-256" | "nistP256" | "prime256v1" | "brainpoolP256r1"
/// key_material_length = 80
///
/// [pki]
/// root = "pki"
/// # client_certificate = "Charlie"
/// # server_certificate = "Diana"
///
/// [exchange]
/// work_dir = "."
/// request_file = "request.uabinary"
/// response_file = "response.uabinary"
///
/// [output]
/// format = "table"  # "table" | "json" | "quiet"
/// verbose = false
///
/// [logging]
/// level = "warn"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Curve and key material length
    #[serde(default)]
    pub handshake: HandshakeConfig,

    /// Certificate store location and identity names
    #[serde(default)]
    pub pki: PkiConfig,

    /// Where request/response messages are handed off
    #[serde(default)]
    pub exchange: ExchangeConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Certificate store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PkiConfig {
    /// Store root holding `certs/` and `private/`
    #[serde(default = "default_pki_root")]
    pub root: PathBuf,

    /// Overrides `<root>/certs`
    #[serde(default)]
    pub certs_dir: Option<PathBuf>,

    /// Overrides `<root>/private`
    #[serde(default)]
    pub private_dir: Option<PathBuf>,

    /// Client identity name (empty = per-curve default)
    #[serde(default)]
    pub client_certificate: Option<String>,

    /// Server identity name (empty = per-curve default)
    #[serde(default)]
    pub server_certificate: Option<String>,
}

fn default_pki_root() -> PathBuf {
    PathBuf::from("pki")
}

impl Default for PkiConfig {
    fn default() -> Self {
        Self {
            root: default_pki_root(),
            certs_dir: None,
            private_dir: None,
            client_certificate: None,
            server_certificate: None,
        }
    }
}

impl PkiConfig {
    pub fn certs_dir(&self) -> PathBuf {
        self.certs_dir
            .clone()
            .unwrap_or_else(|| self.root.join("certs"))
    }

    pub fn private_dir(&self) -> PathBuf {
        self.private_dir
            .clone()
            .unwrap_or_else(|| self.root.join("private"))
    }

    /// Client identity, falling back to the test identity issued for `curve`.
    pub fn client_name(&self, curve: NamedCurve) -> String {
        non_empty(&self.client_certificate)
            .unwrap_or_else(|| default_identities(curve).0.to_string())
    }

    /// Server identity, falling back to the test identity issued for `curve`.
    pub fn server_name(&self, curve: NamedCurve) -> String {
        non_empty(&self.server_certificate)
            .unwrap_or_else(|| default_identities(curve).1.to_string())
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}

/// `(client, server)` identity names of the test PKI for each curve.
pub fn default_identities(curve: NamedCurve) -> (&'static str, &'static str) {
    match curve {
        NamedCurve::P256 => ("Charlie", "Diana"),
        NamedCurve::BrainpoolP256r1 => ("Cindy", "Derek"),
    }
}

/// File hand-off configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Directory request and response files are written to
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Request file name
    #[serde(default = "default_request_file")]
    pub request_file: String,

    /// Response file name
    #[serde(default = "default_response_file")]
    pub response_file: String,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_request_file() -> String {
    "request.uabinary".to_string()
}

fn default_response_file() -> String {
    "response.uabinary".to_string()
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            request_file: default_request_file(),
            response_file: default_response_file(),
        }
    }
}

impl ExchangeConfig {
    pub fn request_path(&self) -> PathBuf {
        self.work_dir.join(&self.request_file)
    }

    pub fn response_path(&self) -> PathBuf {
        self.work_dir.join(&self.response_file)
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format: "table", "json", "quiet"
    #[serde(default = "default_format")]
    pub format: String,

    /// Verbose output
    #[serde(default)]
    pub verbose: bool,
}

fn default_format() -> String {
    "table".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            verbose: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from custom path or default
    pub fn load_from(custom_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = custom_path {
            Self::load(path)
        } else {
            Self::load_default()
        }
    }

    /// Get default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "opcfoundation", "uaecc")
            .map(|dirs| dirs.config_dir().join("uaecc.toml"))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.handshake.validate()?;

        let valid_formats = ["table", "json", "quiet"];
        if !valid_formats.contains(&self.output.format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid output format '{}'. Valid values: {:?}",
                self.output.format, valid_formats
            )));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level '{}'. Valid values: {:?}",
                self.logging.level, valid_levels
            )));
        }

        if self.exchange.request_file.is_empty() || self.exchange.response_file.is_empty() {
            return Err(ConfigError::ValidationError(
                "request_file and response_file must not be empty".to_string(),
            ));
        }
        if self.exchange.request_file == self.exchange.response_file {
            return Err(ConfigError::ValidationError(format!(
                "request_file and response_file must differ, both are '{}'",
                self.exchange.request_file
            )));
        }

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_toml() -> &'static str {
        r#"# uaecc configuration

[handshake]
# Curve for certificates and ephemeral keys. Both parties must agree.
# "P-256" (aliases "nistP256", "prime256v1") or "brainpoolP256r1"
curve = "P-256"
# Bytes derived per direction; the first 80 are the key set, the rest is
# reported as additional material
key_material_length = 80

[pki]
# Store root holding certs/<name>.der and private/<name>.pem
root = "pki"
# Identity names (empty = Charlie/Diana for P-256, Cindy/Derek for brainpoolP256r1)
# client_certificate = "Charlie"
# server_certificate = "Diana"

[exchange]
# Directory the request and response messages are handed off through
work_dir = "."
request_file = "request.uabinary"
response_file = "response.uabinary"

[output]
# Output format: "table", "json", "quiet"
format = "table"
verbose = false

[logging]
# Log level: "error", "warn", "info", "debug", "trace"
level = "warn"
"#
    }
}

/// CLI configuration overrides
///
/// Command-line arguments take precedence over config file values.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Output format override
    pub output_format: Option<String>,
    /// Verbose flag override
    pub verbose: Option<bool>,
    /// Debug flag override
    pub debug: Option<bool>,
    /// Curve override
    pub curve: Option<NamedCurve>,
    /// PKI root override
    pub pki_root: Option<PathBuf>,
    /// Work directory override
    pub work_dir: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to configuration
    pub fn with_overrides(mut self, overrides: &CliOverrides) -> Self {
        if let Some(ref format) = overrides.output_format {
            self.output.format = format.clone();
        }
        if let Some(verbose) = overrides.verbose {
            self.output.verbose = verbose;
        }
        if let Some(debug) = overrides.debug {
            if debug {
                self.logging.level = "debug".to_string();
            }
        }
        if let Some(curve) = overrides.curve {
            self.handshake.curve = curve;
        }
        if let Some(ref root) = overrides.pki_root {
            self.pki.root = root.clone();
        }
        if let Some(ref dir) = overrides.work_dir {
            self.exchange.work_dir = dir.clone();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.handshake.curve, NamedCurve::P256);
        assert_eq!(config.handshake.key_material_length, 80);

        assert_eq!(config.pki.certs_dir(), PathBuf::from("pki/certs"));
        assert_eq!(config.pki.private_dir(), PathBuf::from("pki/private"));

        assert_eq!(config.exchange.request_path(), PathBuf::from("./request.uabinary"));
        assert_eq!(config.exchange.response_path(), PathBuf::from("./response.uabinary"));

        assert_eq!(config.output.format, "table");
        assert!(!config.output.verbose);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_output_format() {
        let mut config = Config::default();
        config.output.format = "xml".to_string();

        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Invalid output format"));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_validate_same_exchange_files() {
        let mut config = Config::default();
        config.exchange.response_file = config.exchange.request_file.clone();
        assert!(config.validate().unwrap_err().to_string().contains("must differ"));
    }

    #[test]
    fn test_unknown_curve_rejected_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "[handshake]\ncurve = \"secp521r1\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().contains("unknown curve"));
    }

    #[test]
    fn test_default_identities_follow_curve() {
        let pki = PkiConfig::default();
        assert_eq!(pki.client_name(NamedCurve::P256), "Charlie");
        assert_eq!(pki.server_name(NamedCurve::P256), "Diana");
        assert_eq!(pki.client_name(NamedCurve::BrainpoolP256r1), "Cindy");
        assert_eq!(pki.server_name(NamedCurve::BrainpoolP256r1), "Derek");

        let pki = PkiConfig {
            client_certificate: Some("Alice".to_string()),
            server_certificate: Some("  ".to_string()),
            ..PkiConfig::default()
        };
        assert_eq!(pki.client_name(NamedCurve::P256), "Alice");
        assert_eq!(pki.server_name(NamedCurve::P256), "Diana");
    }

    #[test]
    fn test_explicit_store_dirs() {
        let pki = PkiConfig {
            certs_dir: Some(PathBuf::from("/etc/ua/certs")),
            ..PkiConfig::default()
        };
        assert_eq!(pki.certs_dir(), PathBuf::from("/etc/ua/certs"));
        assert_eq!(pki.private_dir(), PathBuf::from("pki/private"));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let mut config = Config::default();
        config.handshake = HandshakeConfig::new(NamedCurve::BrainpoolP256r1);
        config.save(&config_path).unwrap();

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded.handshake, config.handshake);
        assert_eq!(loaded.output.format, config.output.format);
        assert_eq!(loaded.logging.level, config.logging.level);
    }

    #[test]
    fn test_cli_overrides() {
        let overrides = CliOverrides {
            output_format: Some("json".to_string()),
            verbose: Some(true),
            debug: Some(true),
            curve: Some(NamedCurve::BrainpoolP256r1),
            pki_root: Some(PathBuf::from("/srv/pki")),
            work_dir: None,
        };

        let config = Config::default().with_overrides(&overrides);

        assert_eq!(config.output.format, "json");
        assert!(config.output.verbose);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.handshake.curve, NamedCurve::BrainpoolP256r1);
        assert_eq!(config.pki.certs_dir(), PathBuf::from("/srv/pki/certs"));
        assert_eq!(config.exchange.work_dir, PathBuf::from("."));
    }

    #[test]
    fn test_toml_parsing() {
        let toml_content = r#"
[handshake]
curve = "brainpoolP256r1"
key_material_length = 96

[pki]
root = "/opt/pki"
client_certificate = "Cindy"

[exchange]
work_dir = "/tmp/exchange"

[output]
format = "json"
verbose = true

[logging]
level = "trace"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();

        assert_eq!(config.handshake.curve, NamedCurve::BrainpoolP256r1);
        assert_eq!(config.handshake.key_material_length, 96);
        assert_eq!(config.pki.root, PathBuf::from("/opt/pki"));
        assert_eq!(config.pki.client_certificate.as_deref(), Some("Cindy"));
        assert_eq!(
            config.exchange.request_path(),
            PathBuf::from("/tmp/exchange/request.uabinary")
        );
        assert_eq!(config.output.format, "json");
        assert!(config.output.verbose);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_sample_toml_is_valid() {
        let config: Config = toml::from_str(Config::sample_toml()).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_path() {
        let path = Config::default_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("uaecc.toml"));
    }

    #[test]
    fn test_load_from_custom_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("custom.toml");
        Config::default().save(&config_path).unwrap();

        let loaded = Config::load_from(Some(&config_path)).unwrap();
        assert_eq!(loaded.handshake.curve, NamedCurve::P256);
    }
}
