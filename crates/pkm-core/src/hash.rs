use sha2::{Digest, Sha256};
use xxhash_rust::xxh3::xxh3_64;

use crate::ids::ChunkHash;

/// `chunk_hash = first 12 hex chars of xxhash64(text)`. Depends only on
/// `text`; whitespace is not trimmed here, callers trim before hashing.
pub fn chunk_hash(text: &str) -> ChunkHash {
    let digest = xxh3_64(text.as_bytes()).to_be_bytes();
    let mut bytes = [0u8; 6];
    bytes.copy_from_slice(&digest[..6]);
    ChunkHash::from_bytes(bytes)
}

/// SHA-256 fallback, kept for the `content_hash`/`file_hash` fields on
/// `DocumentRecord`, which are always full cryptographic hashes regardless
/// of which hash backs chunk identity.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_hash_is_pure_function_of_text() {
        let a = chunk_hash("bei 300°C");
        let b = chunk_hash("bei 300°C");
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_hash_differs_for_different_text() {
        assert_ne!(chunk_hash("a"), chunk_hash("b"));
    }

    #[test]
    fn sha256_hex_is_stable_and_64_chars() {
        let h = sha256_hex(b"hello world");
        assert_eq!(h.len(), 64);
        assert_eq!(h, sha256_hex(b"hello world"));
    }
}
