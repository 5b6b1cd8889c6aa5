//! uaecc - CLI for the ECC secure channel handshake
//!
//! This crate provides a command-line interface for:
//! - Running a client/server exchange through request and response files
//! - Inspecting encoded handshake messages
//! - Recomputing salts and session keys from known inputs

pub mod cli;
pub mod config;
pub mod debug;
pub mod exchange;
pub mod output;

#[cfg(test)]
mod proptests;

pub use cli::Cli;
pub use config::{CliOverrides, Config};
pub use output::{JsonResponse, OutputFormat, OutputFormatter};

use uaecc_crypto::HandshakeError;

/// Exit codes for CLI operations
///
/// Exit codes provide machine-readable status for scripting:
/// - 0: Success - operation completed successfully
/// - 1: General error - unspecified error occurred
/// - 2: Authentication failed - a signature or key usage check failed
/// - 3: Invalid input - bad arguments, configuration or message bytes
/// - 4: Keys differ - both sides completed but derived different material
/// - 5: Not found - a certificate, key or message file is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully (exit code 0)
    Success = 0,
    /// General error (exit code 1)
    GeneralError = 1,
    /// Authentication failed (exit code 2)
    AuthenticationFailed = 2,
    /// Invalid input provided (exit code 3)
    InvalidInput = 3,
    /// Derived material differs between the parties (exit code 4)
    KeysDiffer = 4,
    /// Certificate, key or file not found (exit code 5)
    NotFound = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Convert to process exit code
    pub fn to_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }

    /// Get the exit code name as a string
    pub fn name(&self) -> &'static str {
        match self {
            ExitCode::Success => "SUCCESS",
            ExitCode::GeneralError => "GENERAL_ERROR",
            ExitCode::AuthenticationFailed => "AUTH_FAILED",
            ExitCode::InvalidInput => "INVALID_INPUT",
            ExitCode::KeysDiffer => "KEYS_DIFFER",
            ExitCode::NotFound => "NOT_FOUND",
        }
    }

    /// Get a human-readable description of the exit code
    pub fn description(&self) -> &'static str {
        match self {
            ExitCode::Success => "Operation completed successfully",
            ExitCode::GeneralError => "An unspecified error occurred",
            ExitCode::AuthenticationFailed => "Signature or key usage verification failed",
            ExitCode::InvalidInput => "Invalid arguments, configuration or message",
            ExitCode::KeysDiffer => "The parties derived different key material",
            ExitCode::NotFound => "Certificate, key or file not found",
        }
    }

    /// Exit code for a failed handshake step.
    pub fn for_handshake_error(error: &HandshakeError) -> Self {
        match error {
            HandshakeError::SignatureInvalid
            | HandshakeError::SignatureSelfCheckFailed
            | HandshakeError::InsufficientKeyUsage
            | HandshakeError::KeyMismatch { .. } => ExitCode::AuthenticationFailed,
            HandshakeError::MalformedMessage(_)
            | HandshakeError::InvalidCertificate(_)
            | HandshakeError::InvalidPrivateKey(_)
            | HandshakeError::InvalidPublicKey
            | HandshakeError::UnsupportedKeyAlgorithm { .. }
            | HandshakeError::UnsupportedPointFormat
            | HandshakeError::UnknownCurve(_)
            | HandshakeError::CurveNotSupported(_)
            | HandshakeError::InvalidNumber(_)
            | HandshakeError::InvalidConfig(_)
            | HandshakeError::KdfOutputTooLong { .. } => ExitCode::InvalidInput,
            HandshakeError::InvalidState(_) => ExitCode::GeneralError,
        }
    }
}
