//! Output formatting for CLI results
//!
//! This module provides consistent output formatting across all CLI commands.
//! It supports three output formats:
//! - Table: Human-readable tables (default)
//! - JSON: Structured JSON for scripting and automation
//! - Quiet: Minimal output, exit codes only

use std::str::FromStr;

use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::debug::{DerivedKeysInfo, MessageInfo};
use crate::exchange::{ExchangeReport, KeySetHex};
use crate::ExitCode;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for scripting
    Json,
    /// Minimal output - exit codes only
    Quiet,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "quiet" => Ok(Self::Quiet),
            _ => Err(format!("Unknown output format: {s}")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Quiet => write!(f, "quiet"),
        }
    }
}

/// Standard JSON response wrapper for consistent schema
#[derive(Serialize)]
pub struct JsonResponse<T: Serialize> {
    /// Whether the operation was successful
    pub success: bool,
    /// The response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// ISO 8601 timestamp
    pub timestamp: String,
    /// Command that was executed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl<T: Serialize> JsonResponse<T> {
    /// Create a successful response with command context
    pub fn success_with_command(data: T, command: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: Some(command.to_string()),
        }
    }
}

impl JsonResponse<()> {
    /// Create an error response with command context
    pub fn error_with_command(message: &str, command: &str) -> JsonResponse<()> {
        JsonResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: Some(command.to_string()),
        }
    }
}

/// Formats output for different modes
pub struct OutputFormatter {
    format: OutputFormat,
    verbose: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Get the current output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.format == OutputFormat::Quiet
    }

    /// Format a completed exchange
    pub fn format_exchange(&self, report: &ExchangeReport) -> String {
        match self.format {
            OutputFormat::Table => self.exchange_table(report),
            OutputFormat::Json => self.to_json_response(report, "exchange"),
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Format an inspected message
    pub fn format_message(&self, info: &MessageInfo) -> String {
        match self.format {
            OutputFormat::Table => self.message_table(info),
            OutputFormat::Json => self.to_json_response(info, "inspect"),
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Format recomputed session keys
    pub fn format_keys(&self, info: &DerivedKeysInfo) -> String {
        match self.format {
            OutputFormat::Table => self.keys_table(info),
            OutputFormat::Json => self.to_json_response(info, "derive"),
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Format raw KDF output. Quiet mode prints the bare hex.
    pub fn format_kdf(&self, output_hex: &str, length: usize) -> String {
        match self.format {
            OutputFormat::Table => format!("Key Material ({length} bytes): {output_hex}"),
            OutputFormat::Json => self.to_json_response(
                &serde_json::json!({ "length": length, "output": output_hex }),
                "kdf",
            ),
            OutputFormat::Quiet => output_hex.to_string(),
        }
    }

    /// Format error with exit code context
    pub fn format_error_with_code(&self, error: &dyn std::error::Error, code: ExitCode) -> String {
        match self.format {
            OutputFormat::Table => format!("Error: {error}"),
            OutputFormat::Json => {
                let response = JsonResponse::<()> {
                    success: false,
                    data: None,
                    error: Some(error.to_string()),
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    command: None,
                };
                let mut output = serde_json::to_value(&response).unwrap_or_default();
                output["exit_code"] = serde_json::json!(code as i32);
                output["exit_code_name"] = serde_json::json!(code.name());
                self.to_json(&output)
            }
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Format progress message (only shown in verbose mode)
    pub fn progress(&self, message: &str) {
        if self.verbose && self.format == OutputFormat::Table {
            eprintln!("... {message}");
        }
    }

    /// Format success message
    pub fn success(&self, message: &str) {
        if self.format == OutputFormat::Table {
            println!("✓ {message}");
        }
    }

    /// Format error message
    pub fn error(&self, message: &str) {
        if self.format == OutputFormat::Table {
            eprintln!("✗ {message}");
        }
    }

    /// Format warning message
    pub fn warning(&self, message: &str) {
        if self.format == OutputFormat::Table {
            eprintln!("⚠ {message}");
        }
    }

    fn to_json<T: Serialize>(&self, value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }

    /// Format data with consistent JSON response wrapper
    fn to_json_response<T: Serialize>(&self, value: &T, command: &str) -> String {
        let response = JsonResponse::success_with_command(value, command);
        serde_json::to_string_pretty(&response).unwrap_or_else(|e| {
            let err_response =
                JsonResponse::<()>::error_with_command(&format!("Serialization error: {e}"), command);
            self.to_json(&err_response)
        })
    }

    fn exchange_table(&self, report: &ExchangeReport) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Property", "Value"]);
        table.add_row(vec!["Curve", report.curve.name()]);
        table.add_row(vec!["Client", &report.client]);
        table.add_row(vec!["Server", &report.server]);
        table.add_row(vec![
            "Request",
            &format!("{} ({} bytes)", report.request_file.display(), report.request_bytes),
        ]);
        table.add_row(vec![
            "Response",
            &format!("{} ({} bytes)", report.response_file.display(), report.response_bytes),
        ]);
        if self.verbose {
            table.add_row(vec!["ClientNonce", &report.client_nonce]);
            table.add_row(vec!["ServerNonce", &report.server_nonce]);
        }
        table.add_row(vec!["ClientSalt", &report.client_salt]);
        table.add_row(vec!["ServerSalt", &report.server_salt]);
        table.add_row(vec!["ClientSecret", &report.client_secret]);
        table.add_row(vec!["ServerSecret", &report.server_secret]);
        table.add_row(vec!["Secrets Match", yes_no(report.secrets_match)]);
        add_key_rows(&mut table, "Server", &report.server_keys);
        add_key_rows(&mut table, "Client", &report.client_keys);
        table.add_row(vec!["Keys Match", yes_no(report.keys_match)]);
        table.to_string()
    }

    fn message_table(&self, info: &MessageInfo) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Field", "Value"]);
        table.add_row(vec!["Total Length", &format!("{} bytes", info.total_length)]);
        table.add_row(vec!["Certificate", &info.certificate_subject]);
        table.add_row(vec!["Certificate Size", &format!("{} bytes", info.certificate_length)]);
        table.add_row(vec!["Fingerprint", &info.certificate_fingerprint]);
        table.add_row(vec!["Curve", &info.curve]);
        table.add_row(vec!["Ephemeral Key Size", &format!("{} bytes", info.ephemeral_key_length)]);
        table.add_row(vec!["Signature Size", &format!("{} bytes", info.signature_length)]);
        table.add_row(vec!["Nonce", &info.nonce]);
        table.add_row(vec!["Signature Valid", yes_no(info.signature_valid)]);
        table.to_string()
    }

    fn keys_table(&self, info: &DerivedKeysInfo) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Property", "Value"]);
        table.add_row(vec!["ClientSalt", &info.client_salt]);
        table.add_row(vec!["ServerSalt", &info.server_salt]);
        add_key_rows(&mut table, "Server", &info.server_keys);
        add_key_rows(&mut table, "Client", &info.client_keys);
        table.to_string()
    }
}

fn add_key_rows(table: &mut Table, direction: &str, keys: &KeySetHex) {
    table.add_row(vec![format!("{direction}SigningKey"), keys.signing_key.clone()]);
    table.add_row(vec![format!("{direction}EncryptingKey"), keys.encrypting_key.clone()]);
    table.add_row(vec![
        format!("{direction}InitializationVector"),
        keys.initialization_vector.clone(),
    ]);
    if !keys.additional_material.is_empty() {
        table.add_row(vec![
            format!("{direction}AdditionalMaterial"),
            keys.additional_material.clone(),
        ]);
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
