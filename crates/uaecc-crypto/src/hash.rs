use sha2::{Digest, Sha256};

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    let out = h.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}

/// Short hex fingerprint of a certificate for log lines: first 8 bytes of SHA-256(der).
pub fn fingerprint(der: &[u8]) -> String {
    hex::encode(&sha256(der)[..8])
}
