//! Salt construction for session key derivation.
//!
//! The builder is direction-agnostic. Callers get the client and server
//! salts by swapping which nonce goes first.

/// Label of the client-direction salt.
pub const CLIENT_LABEL: &str = "opcua-client";

/// Label of the server-direction salt.
pub const SERVER_LABEL: &str = "opcua-server";

/// `label || first || second`. Absent parts contribute zero bytes.
pub fn build_salt(label: Option<&str>, first: Option<&[u8]>, second: Option<&[u8]>) -> Vec<u8> {
    let label = label.map(str::as_bytes).unwrap_or_default();
    let first = first.unwrap_or_default();
    let second = second.unwrap_or_default();

    let mut salt = Vec::with_capacity(label.len() + first.len() + second.len());
    salt.extend_from_slice(label);
    salt.extend_from_slice(first);
    salt.extend_from_slice(second);
    salt
}

/// Salt for keys protecting client-to-server traffic.
pub fn client_salt(client_nonce: &[u8], server_nonce: &[u8]) -> Vec<u8> {
    build_salt(Some(CLIENT_LABEL), Some(client_nonce), Some(server_nonce))
}

/// Salt for keys protecting server-to-client traffic.
pub fn server_salt(client_nonce: &[u8], server_nonce: &[u8]) -> Vec<u8> {
    build_salt(Some(SERVER_LABEL), Some(server_nonce), Some(client_nonce))
}
