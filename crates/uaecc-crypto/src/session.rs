//! Two-party handshake state machine.
//!
//! ```text
//! client                                   server
//! Idle                                     Idle
//!   create_request ──── request ────────▶   respond_to_request
//! RequestSent                              RequestReceived
//!                 ◀─── response ──────────  ResponseSent (keys known)
//!   finish_with_response
//! ResponseReceived
//! SecretEstablished (keys known)
//! ```
//!
//! Any error moves the session to [`HandshakeState::Failed`] and drops the
//! pending ephemeral key. A call made in the wrong state is rejected with
//! [`HandshakeError::InvalidState`] and changes nothing.

use std::fmt;

use tracing::{debug, trace, warn};

use crate::bignum::to_hex;
use crate::certificate::{extract_public_key, Certificate};
use crate::config::HandshakeConfig;
use crate::curve::NamedCurve;
use crate::engine::{KeyAgreementEngine, SignatureEngine};
use crate::error::{HandshakeError, Result};
use crate::kdf::{derive, DerivedKeySet, KEY_SET_LEN};
use crate::keys::{EphemeralKeyPair, Nonce, PrivateSigningKey, SharedSecret};
use crate::message;
use crate::salt::{client_salt, server_salt};

/// Which side of the exchange a session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => f.write_str("client"),
            Role::Server => f.write_str("server"),
        }
    }
}

/// Where in the exchange a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Encode,
    Decode,
    Agreement,
    Derivation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    stage: FailureStage,
    error: HandshakeError,
}

impl FailureReason {
    pub fn stage(&self) -> FailureStage {
        self.stage
    }

    pub fn error(&self) -> &HandshakeError {
        &self.error
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    RequestSent,
    RequestReceived,
    ResponseSent,
    ResponseReceived,
    SecretEstablished,
    Failed(FailureReason),
}

/// Key sets for both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    /// Protects client-to-server traffic.
    pub client: DerivedKeySet,
    /// Protects server-to-client traffic.
    pub server: DerivedKeySet,
}

/// Everything known once the exchange has completed.
#[derive(Debug)]
pub struct EstablishedSecret {
    pub shared_secret: SharedSecret,
    pub client_nonce: Nonce,
    pub server_nonce: Nonce,
    pub peer_certificate: Certificate,
    pub keys: SessionKeys,
}

/// Derive both directions' key sets from an ECDH secret.
///
/// The client set is keyed by `"opcua-client" || client || server`, the server
/// set by `"opcua-server" || server || client`.
pub fn derive_session_keys(
    secret: &SharedSecret,
    client_nonce: &[u8],
    server_nonce: &[u8],
) -> Result<SessionKeys> {
    derive_session_keys_len(secret, client_nonce, server_nonce, KEY_SET_LEN)
}

fn derive_session_keys_len(
    secret: &SharedSecret,
    client_nonce: &[u8],
    server_nonce: &[u8],
    length: usize,
) -> Result<SessionKeys> {
    let c_salt = client_salt(client_nonce, server_nonce);
    let s_salt = server_salt(client_nonce, server_nonce);
    trace!(client_salt = %to_hex(&c_salt), server_salt = %to_hex(&s_salt), "derived salts");

    let client = DerivedKeySet::from_key_material(&derive(secret.as_bytes(), &c_salt, length)?)?;
    let server = DerivedKeySet::from_key_material(&derive(secret.as_bytes(), &s_salt, length)?)?;
    Ok(SessionKeys { client, server })
}

/// One party's side of the handshake.
pub struct HandshakeSession<E: SignatureEngine + KeyAgreementEngine> {
    engine: E,
    role: Role,
    config: HandshakeConfig,
    certificate: Certificate,
    signing_key: PrivateSigningKey,
    state: HandshakeState,
    pending: Option<EphemeralKeyPair>,
    own_nonce: Option<Nonce>,
    established: Option<EstablishedSecret>,
}

impl<E: SignatureEngine + KeyAgreementEngine> HandshakeSession<E> {
    /// Create a session for `role` presenting `certificate`.
    ///
    /// The certificate must carry a usable EC key on the configured curve and
    /// `signing_key` must be on that same curve.
    pub fn new(
        engine: E,
        role: Role,
        config: HandshakeConfig,
        certificate: Certificate,
        signing_key: PrivateSigningKey,
    ) -> Result<Self> {
        let cert_key = extract_public_key(&certificate)?;
        if cert_key.curve != config.curve {
            return Err(HandshakeError::KeyMismatch {
                key: config.curve,
                certificate: cert_key.curve,
            });
        }
        if signing_key.curve() != cert_key.curve {
            return Err(HandshakeError::KeyMismatch {
                key: signing_key.curve(),
                certificate: cert_key.curve,
            });
        }
        config
            .validate()
            .map_err(|e| HandshakeError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            engine,
            role,
            config,
            certificate,
            signing_key,
            state: HandshakeState::Idle,
            pending: None,
            own_nonce: None,
            established: None,
        })
    }

    pub fn client(
        engine: E,
        config: HandshakeConfig,
        certificate: Certificate,
        signing_key: PrivateSigningKey,
    ) -> Result<Self> {
        Self::new(engine, Role::Client, config, certificate, signing_key)
    }

    pub fn server(
        engine: E,
        config: HandshakeConfig,
        certificate: Certificate,
        signing_key: PrivateSigningKey,
    ) -> Result<Self> {
        Self::new(engine, Role::Server, config, certificate, signing_key)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    pub fn curve(&self) -> NamedCurve {
        self.config.curve
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// The negotiated secret, once the exchange has completed.
    pub fn established(&self) -> Option<&EstablishedSecret> {
        self.established.as_ref()
    }

    /// Client: build the request with a freshly generated ephemeral key.
    pub fn create_request(&mut self) -> Result<Vec<u8>> {
        self.expect(Role::Client, &HandshakeState::Idle, "create_request")?;
        let ephemeral = self
            .engine
            .generate_ephemeral(self.config.curve)
            .map_err(|e| self.fail(FailureStage::Agreement, e))?;
        self.create_request_with(ephemeral)
    }

    /// Client: build the request around a caller-supplied ephemeral key.
    pub fn create_request_with(&mut self, ephemeral: EphemeralKeyPair) -> Result<Vec<u8>> {
        self.expect(Role::Client, &HandshakeState::Idle, "create_request")?;
        self.check_ephemeral_curve(&ephemeral)
            .map_err(|e| self.fail(FailureStage::Encode, e))?;

        let encoded = message::encode(
            &self.engine,
            &self.certificate,
            &self.signing_key,
            ephemeral.public(),
        )
        .map_err(|e| self.fail(FailureStage::Encode, e))?;

        self.pending = Some(ephemeral);
        self.own_nonce = Some(encoded.nonce);
        self.transition(HandshakeState::RequestSent);
        Ok(encoded.bytes)
    }

    /// Server: verify `request`, answer it with a fresh ephemeral key and
    /// derive the session keys.
    pub fn respond_to_request(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        self.expect(Role::Server, &HandshakeState::Idle, "respond_to_request")?;
        let ephemeral = self
            .engine
            .generate_ephemeral(self.config.curve)
            .map_err(|e| self.fail(FailureStage::Agreement, e))?;
        self.respond_to_request_with(request, ephemeral)
    }

    /// Server: as [`respond_to_request`](Self::respond_to_request) with a
    /// caller-supplied ephemeral key.
    pub fn respond_to_request_with(
        &mut self,
        request: &[u8],
        ephemeral: EphemeralKeyPair,
    ) -> Result<Vec<u8>> {
        self.expect(Role::Server, &HandshakeState::Idle, "respond_to_request")?;
        self.check_ephemeral_curve(&ephemeral)
            .map_err(|e| self.fail(FailureStage::Encode, e))?;

        let decoded = message::decode(&self.engine, request)
            .map_err(|e| self.fail(FailureStage::Decode, e))?;
        self.transition(HandshakeState::RequestReceived);

        let encoded = message::encode(
            &self.engine,
            &self.certificate,
            &self.signing_key,
            ephemeral.public(),
        )
        .map_err(|e| self.fail(FailureStage::Encode, e))?;

        let shared = self
            .engine
            .agree(ephemeral, &decoded.peer_public)
            .map_err(|e| self.fail(FailureStage::Agreement, e))?;

        let client_nonce = decoded.nonce;
        let server_nonce = encoded.nonce;
        self.establish(shared, client_nonce, server_nonce, decoded.certificate)?;
        self.transition(HandshakeState::ResponseSent);
        Ok(encoded.bytes)
    }

    /// Client: verify `response` and derive the session keys.
    pub fn finish_with_response(&mut self, response: &[u8]) -> Result<()> {
        self.expect(Role::Client, &HandshakeState::RequestSent, "finish_with_response")?;

        let decoded = message::decode(&self.engine, response)
            .map_err(|e| self.fail(FailureStage::Decode, e))?;
        self.transition(HandshakeState::ResponseReceived);

        let (ephemeral, client_nonce) = match (self.pending.take(), self.own_nonce.take()) {
            (Some(ephemeral), Some(nonce)) => (ephemeral, nonce),
            _ => {
                let err = HandshakeError::InvalidState("no pending ephemeral key".to_string());
                return Err(self.fail(FailureStage::Agreement, err));
            }
        };

        let shared = self
            .engine
            .agree(ephemeral, &decoded.peer_public)
            .map_err(|e| self.fail(FailureStage::Agreement, e))?;

        self.establish(shared, client_nonce, decoded.nonce, decoded.certificate)?;
        self.transition(HandshakeState::SecretEstablished);
        Ok(())
    }

    fn establish(
        &mut self,
        shared_secret: SharedSecret,
        client_nonce: Nonce,
        server_nonce: Nonce,
        peer_certificate: Certificate,
    ) -> Result<()> {
        let keys = derive_session_keys_len(
            &shared_secret,
            client_nonce.as_bytes(),
            server_nonce.as_bytes(),
            self.config.key_material_length,
        )
        .map_err(|e| self.fail(FailureStage::Derivation, e))?;

        self.established = Some(EstablishedSecret {
            shared_secret,
            client_nonce,
            server_nonce,
            peer_certificate,
            keys,
        });
        Ok(())
    }

    fn check_ephemeral_curve(&self, ephemeral: &EphemeralKeyPair) -> Result<()> {
        if ephemeral.curve() != self.config.curve {
            return Err(HandshakeError::KeyMismatch {
                key: ephemeral.curve(),
                certificate: self.config.curve,
            });
        }
        Ok(())
    }

    fn expect(&self, role: Role, state: &HandshakeState, op: &str) -> Result<()> {
        if self.role != role {
            return Err(HandshakeError::InvalidState(format!(
                "{op} is a {role} operation, session is {}",
                self.role
            )));
        }
        if self.state != *state {
            return Err(HandshakeError::InvalidState(format!(
                "{op} requires {state:?}, session is {:?}",
                self.state
            )));
        }
        Ok(())
    }

    fn transition(&mut self, next: HandshakeState) {
        debug!(role = %self.role, from = ?self.state, to = ?next, "handshake state transition");
        self.state = next;
    }

    fn fail(&mut self, stage: FailureStage, error: HandshakeError) -> HandshakeError {
        warn!(role = %self.role, ?stage, %error, "handshake failed");
        self.pending = None;
        self.own_nonce = None;
        self.established = None;
        self.transition(HandshakeState::Failed(FailureReason {
            stage,
            error: error.clone(),
        }));
        error
    }
}

impl<E: SignatureEngine + KeyAgreementEngine> fmt::Debug for HandshakeSession<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeSession")
            .field("role", &self.role)
            .field("curve", &self.config.curve)
            .field("state", &self.state)
            .field("certificate", &self.certificate)
            .finish_non_exhaustive()
    }
}
