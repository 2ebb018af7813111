//! Content hashing for requests and result packages.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::RadError;
use crate::serde::to_canonical_json_bytes;

/// Computes a stable SHA256 hash for the provided serializable value.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, RadError> {
    let bytes = to_canonical_json_bytes(value)?;
    Ok(digest_hex(&bytes))
}

/// Returns the lowercase hex SHA256 digest of raw bytes.
pub fn digest_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
