//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use uaecc_crypto::{DirectoryStore, NamedCurve};

use crate::config::Config;
use crate::debug::{DebugError, DebugTools};
use crate::exchange::run_exchange;
use crate::output::{OutputFormat, OutputFormatter};
use crate::ExitCode;

/// uaecc - ECC secure channel handshake tool
#[derive(Parser, Debug)]
#[command(name = "uaecc")]
#[command(version, about = "ECC secure channel handshake - exchange, inspect and derive")]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Debug mode (handshake-level tracing)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file path
    #[arg(long, global = true, env = "UAECC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Curve: P-256 (nistP256, prime256v1) or brainpoolP256r1
    #[arg(long, global = true)]
    pub curve: Option<NamedCurve>,

    /// Certificate store root holding certs/ and private/
    #[arg(long, global = true)]
    pub pki: Option<PathBuf>,

    /// Directory request and response files are exchanged through
    #[arg(long = "work-dir", global = true)]
    pub work_dir: Option<PathBuf>,
}

impl Cli {
    /// Execute the CLI command with a pre-loaded configuration
    ///
    /// CLI arguments have already been merged into `config`.
    pub fn execute_with_config(self, config: Config) -> anyhow::Result<ExitCode> {
        let format = config
            .output
            .format
            .parse::<OutputFormat>()
            .map_err(anyhow::Error::msg)?;
        let formatter = OutputFormatter::new(format, config.output.verbose);

        match self.command {
            Commands::Exchange(args) => args.execute(config, &formatter),
            Commands::Inspect(args) => args.execute(&formatter),
            Commands::Derive(args) => args.execute(&formatter),
            Commands::Kdf(args) => args.execute(&formatter),
            Commands::Config(args) => args.execute(&config, &formatter),
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a client/server exchange through request and response files
    Exchange(ExchangeArgs),
    /// Decode and verify an encoded handshake message
    Inspect(InspectArgs),
    /// Recompute salts and session keys from a secret and both nonces
    Derive(DeriveArgs),
    /// Run the key derivation function on raw inputs
    Kdf(KdfArgs),
    /// Show or create configuration
    Config(ConfigArgs),
}

/// Arguments for the exchange command
#[derive(Parser, Debug)]
pub struct ExchangeArgs {
    /// Client identity name in the certificate store
    #[arg(long)]
    pub client: Option<String>,

    /// Server identity name in the certificate store
    #[arg(long)]
    pub server: Option<String>,
}

impl ExchangeArgs {
    pub fn execute(self, mut config: Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        if self.client.is_some() {
            config.pki.client_certificate = self.client;
        }
        if self.server.is_some() {
            config.pki.server_certificate = self.server;
        }

        let store = DirectoryStore::new(config.pki.certs_dir(), config.pki.private_dir());
        formatter.progress(&format!(
            "Exchanging {} -> {} on {}",
            config.pki.client_name(config.handshake.curve),
            config.pki.server_name(config.handshake.curve),
            config.handshake.curve
        ));

        match run_exchange(&store, &config) {
            Ok(report) => {
                let out = formatter.format_exchange(&report);
                if !out.is_empty() {
                    println!("{out}");
                }
                if !report.secrets_match {
                    formatter.error("CLIENT AND SERVER SECRETS DO NOT MATCH!");
                    return Ok(ExitCode::KeysDiffer);
                }
                if !report.keys_match {
                    formatter.error("CLIENT AND SERVER KEYS DO NOT MATCH!");
                    return Ok(ExitCode::KeysDiffer);
                }
                formatter.success("Secure channel keys established");
                Ok(ExitCode::Success)
            }
            Err(e) => {
                let code = e.exit_code();
                report_error(formatter, &e, code);
                Ok(code)
            }
        }
    }
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Encoded message file (request.uabinary or response.uabinary)
    pub file: PathBuf,
}

impl InspectArgs {
    pub fn execute(self, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        formatter.progress(&format!("Decoding {}", self.file.display()));
        match DebugTools::new().inspect_file(&self.file) {
            Ok(info) => {
                let out = formatter.format_message(&info);
                if !out.is_empty() {
                    println!("{out}");
                }
                formatter.success("Message decoded and signature verified");
                Ok(ExitCode::Success)
            }
            Err(e) => {
                let code = debug_exit_code(&e);
                report_error(formatter, &e, code);
                Ok(code)
            }
        }
    }
}

/// Arguments for the derive command
#[derive(Parser, Debug)]
pub struct DeriveArgs {
    /// Shared secret (hex)
    #[arg(long)]
    pub secret: String,

    /// Client nonce (hex)
    #[arg(long = "client-nonce")]
    pub client_nonce: String,

    /// Server nonce (hex)
    #[arg(long = "server-nonce")]
    pub server_nonce: String,
}

impl DeriveArgs {
    pub fn execute(self, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        let tools = DebugTools::new();
        match tools.derive_keys_from_hex(&self.secret, &self.client_nonce, &self.server_nonce) {
            Ok(info) => {
                let out = formatter.format_keys(&info);
                if !out.is_empty() {
                    println!("{out}");
                }
                Ok(ExitCode::Success)
            }
            Err(e) => {
                let code = debug_exit_code(&e);
                report_error(formatter, &e, code);
                Ok(code)
            }
        }
    }
}

/// Arguments for the kdf command
#[derive(Parser, Debug)]
pub struct KdfArgs {
    /// HMAC key (hex)
    #[arg(long)]
    pub secret: String,

    /// Salt (hex)
    #[arg(long)]
    pub salt: String,

    /// Output length in bytes
    #[arg(long, default_value_t = 80)]
    pub length: usize,
}

impl KdfArgs {
    pub fn execute(self, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        match DebugTools::new().kdf_from_hex(&self.secret, &self.salt, self.length) {
            Ok(output) => {
                println!("{}", formatter.format_kdf(&output, self.length));
                Ok(ExitCode::Success)
            }
            Err(e) => {
                let code = debug_exit_code(&e);
                report_error(formatter, &e, code);
                Ok(code)
            }
        }
    }
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print a commented sample configuration
    Sample,
    /// Write the effective configuration (file values plus flags) to disk
    Init {
        /// Target path (defaults to the platform config location)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigArgs {
    pub fn execute(self, config: &Config, formatter: &OutputFormatter) -> anyhow::Result<ExitCode> {
        match self.action {
            ConfigAction::Show => {
                match formatter.format() {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
                    _ => println!("{}", toml::to_string_pretty(config)?),
                }
                Ok(ExitCode::Success)
            }
            ConfigAction::Sample => {
                print!("{}", Config::sample_toml());
                Ok(ExitCode::Success)
            }
            ConfigAction::Init { path, force } => {
                let Some(path) = path.or_else(Config::default_path) else {
                    formatter.error("No default configuration location on this platform");
                    return Ok(ExitCode::InvalidInput);
                };
                if path.exists() && !force {
                    formatter.warning(&format!(
                        "{} already exists, use --force to overwrite",
                        path.display()
                    ));
                    return Ok(ExitCode::InvalidInput);
                }
                config.save(&path)?;
                formatter.success(&format!("Wrote {}", path.display()));
                Ok(ExitCode::Success)
            }
        }
    }
}

fn debug_exit_code(error: &DebugError) -> ExitCode {
    match error {
        DebugError::InvalidInput(_) => ExitCode::InvalidInput,
        DebugError::Handshake(e) => ExitCode::for_handshake_error(e),
        DebugError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ExitCode::NotFound,
        DebugError::Io(_) => ExitCode::GeneralError,
    }
}

fn report_error(formatter: &OutputFormatter, error: &dyn std::error::Error, code: ExitCode) {
    match formatter.format() {
        OutputFormat::Json => println!("{}", formatter.format_error_with_code(error, code)),
        _ => formatter.error(&error.to_string()),
    }
}
