//! SHA-256 digest helper for block sealing and verification.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
///
/// Always 64 lowercase hex characters; hashing itself never fails.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}
