//! Opaque refresh-token values and their stored digests.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Number of random bytes behind each opaque token.
pub const TOKEN_BYTES: usize = 32;

/// Length of a SHA-256 digest.
pub const HASH_BYTES: usize = 32;

/// Generate a fresh opaque token: 32 CSPRNG bytes, URL-safe base64 without
/// padding (43 characters).
pub fn generate_opaque_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 digest of the token's UTF-8 bytes. This is the only form that is
/// ever persisted or compared.
pub fn hash_token(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

/// Short hex prefix of a digest, safe to put in logs.
pub fn fingerprint(hash: &[u8]) -> String {
    hash.iter().take(4).map(|b| format!("{b:02x}")).collect()
}
