//! Iterative HMAC-SHA-256 key derivation.
//!
//! ```text
//! H1 = HMAC(secret, salt || 0x01)
//! Hn = HMAC(secret, H(n-1) || salt || n)
//! output = H1 || H2 || ... truncated to the requested length
//! ```
//!
//! The block chaining is that of HKDF-Expand (RFC 5869) with the raw ECDH
//! secret used directly as the PRK and the salt in the `info` position.
//! There is no extract step. The loop is written out over HMAC because the
//! secret is not required to be a full hash length.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{HandshakeError, Result};

type HmacSha256 = Hmac<Sha256>;

const HASH_LEN: usize = 32;

/// Counter is a single byte starting at one.
pub const MAX_OUTPUT_LEN: usize = 255 * HASH_LEN;

pub const SIGNING_KEY_LEN: usize = 32;
pub const ENCRYPTING_KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;

/// Bytes of key material per direction.
pub const KEY_SET_LEN: usize = SIGNING_KEY_LEN + ENCRYPTING_KEY_LEN + IV_LEN;

/// Expand `secret` and `salt` into `output_length` bytes.
pub fn derive(secret: &[u8], salt: &[u8], output_length: usize) -> Result<Zeroizing<Vec<u8>>> {
    if output_length > MAX_OUTPUT_LEN {
        return Err(HandshakeError::KdfOutputTooLong {
            requested: output_length,
            max: MAX_OUTPUT_LEN,
        });
    }

    let mac = HmacSha256::new_from_slice(secret).expect("HMAC can take keys of any size");
    let mut output = Zeroizing::new(Vec::with_capacity(output_length));
    let mut previous: Option<Zeroizing<[u8; HASH_LEN]>> = None;
    let mut counter: u8 = 1;

    while output.len() < output_length {
        let mut round = mac.clone();
        if let Some(prev) = previous.as_ref() {
            round.update(&prev[..]);
        }
        round.update(salt);
        round.update(&[counter]);

        let mut block = Zeroizing::new([0u8; HASH_LEN]);
        block.copy_from_slice(&round.finalize().into_bytes());

        let take = (output_length - output.len()).min(HASH_LEN);
        output.extend_from_slice(&block[..take]);
        previous = Some(block);
        counter = counter.wrapping_add(1);
    }

    Ok(output)
}

/// Keys protecting one direction of the channel.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKeySet {
    pub signing_key: [u8; SIGNING_KEY_LEN],
    pub encrypting_key: [u8; ENCRYPTING_KEY_LEN],
    pub initialization_vector: [u8; IV_LEN],
    /// Material derived past the first [`KEY_SET_LEN`] bytes, empty unless a
    /// longer `key_material_length` is configured.
    pub additional_material: Vec<u8>,
}

impl DerivedKeySet {
    /// Split at least [`KEY_SET_LEN`] bytes into signing key, encrypting key
    /// and IV, in that order. Anything after the IV is kept as additional
    /// material.
    pub fn from_key_material(material: &[u8]) -> Result<Self> {
        if material.len() < KEY_SET_LEN {
            return Err(HandshakeError::InvalidState(format!(
                "need {KEY_SET_LEN} bytes of key material, got {}",
                material.len()
            )));
        }
        let mut keys = Self {
            signing_key: [0u8; SIGNING_KEY_LEN],
            encrypting_key: [0u8; ENCRYPTING_KEY_LEN],
            initialization_vector: [0u8; IV_LEN],
            additional_material: Vec::new(),
        };
        let (signing, rest) = material.split_at(SIGNING_KEY_LEN);
        let (encrypting, rest) = rest.split_at(ENCRYPTING_KEY_LEN);
        keys.signing_key.copy_from_slice(signing);
        keys.encrypting_key.copy_from_slice(encrypting);
        let (iv, additional) = rest.split_at(IV_LEN);
        keys.initialization_vector.copy_from_slice(iv);
        keys.additional_material = additional.to_vec();
        Ok(keys)
    }

    /// Concatenated key material as produced by the KDF.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut out =
            Zeroizing::new(Vec::with_capacity(KEY_SET_LEN + self.additional_material.len()));
        out.extend_from_slice(&self.signing_key);
        out.extend_from_slice(&self.encrypting_key);
        out.extend_from_slice(&self.initialization_vector);
        out.extend_from_slice(&self.additional_material);
        out
    }
}

impl fmt::Debug for DerivedKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKeySet([REDACTED])")
    }
}

/// `derive(secret, salt, 80)` split into a [`DerivedKeySet`].
pub fn derive_key_set(secret: &[u8], salt: &[u8]) -> Result<DerivedKeySet> {
    let material = derive(secret, salt, KEY_SET_LEN)?;
    DerivedKeySet::from_key_material(&material)
}
