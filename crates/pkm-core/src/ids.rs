use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error("invalid document id {0:?}: not a 26-char Crockford-Base32 ULID")]
    InvalidUlid(String),
    #[error("invalid chunk hash {0:?}: expected 12 hex chars")]
    InvalidChunkHash(String),
    #[error("invalid chunk id {0:?}: expected \"{{doc_id}}:{{chunk_hash}}\"")]
    InvalidChunkId(String),
}

/// Document identity. Wraps a ULID rather than exposing it directly so the
/// rest of the workspace never has to reach for the `ulid` crate itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(Ulid);

impl DocId {
    /// Mints a new, time-ordered document id. The only non-deterministic
    /// constructor; every other path parses an existing id.
    pub fn generate() -> Self {
        DocId(Ulid::new())
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 26 || !s.bytes().all(is_crockford_byte) {
            return Err(IdError::InvalidUlid(s.to_string()));
        }
        Ulid::from_str(s)
            .map(DocId)
            .map_err(|_| IdError::InvalidUlid(s.to_string()))
    }
}

fn is_crockford_byte(b: u8) -> bool {
    matches!(b, b'0'..=b'9' | b'A'..=b'H' | b'J' | b'K' | b'M' | b'N' | b'P'..=b'T' | b'V'..=b'Z')
}

/// First 12 hex chars of xxhash64 (or the SHA-256 fallback) of a chunk's text.
/// 48 bits of entropy, stored as 6 raw bytes rather than the hex string itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChunkHash([u8; 6]);

impl ChunkHash {
    pub fn from_bytes(bytes: [u8; 6]) -> Self {
        ChunkHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for ChunkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for ChunkHash {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 12 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IdError::InvalidChunkHash(s.to_string()));
        }
        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| IdError::InvalidChunkHash(s.to_string()))?;
        }
        Ok(ChunkHash(bytes))
    }
}

impl TryFrom<String> for ChunkHash {
    type Error = IdError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChunkHash> for String {
    fn from(value: ChunkHash) -> Self {
        value.to_string()
    }
}

/// `"{doc_id}:{chunk_hash}"` — the globally unique identity of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChunkId {
    pub doc_id: DocId,
    pub chunk_hash: ChunkHash,
}

impl ChunkId {
    pub fn new(doc_id: DocId, chunk_hash: ChunkHash) -> Self {
        ChunkId { doc_id, chunk_hash }
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.doc_id, self.chunk_hash)
    }
}

impl FromStr for ChunkId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (doc_part, hash_part) = s
            .split_once(':')
            .ok_or_else(|| IdError::InvalidChunkId(s.to_string()))?;
        let doc_id = doc_part
            .parse()
            .map_err(|_| IdError::InvalidChunkId(s.to_string()))?;
        let chunk_hash = hash_part
            .parse()
            .map_err(|_| IdError::InvalidChunkId(s.to_string()))?;
        Ok(ChunkId { doc_id, chunk_hash })
    }
}

impl TryFrom<String> for ChunkId {
    type Error = IdError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChunkId> for String {
    fn from(value: ChunkId) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_roundtrips_through_display_and_parse() {
        let id = DocId::generate();
        let s = id.to_string();
        assert_eq!(s.len(), 26);
        let parsed: DocId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn doc_id_rejects_wrong_length() {
        assert!("too-short".parse::<DocId>().is_err());
    }

    #[test]
    fn chunk_hash_roundtrips() {
        let h = ChunkHash::from_bytes([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        assert_eq!(h.to_string(), "deadbeef0001");
        let parsed: ChunkHash = "deadbeef0001".parse().unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn chunk_id_formats_as_doc_colon_hash() {
        let doc_id = DocId::generate();
        let hash = ChunkHash::from_bytes([1, 2, 3, 4, 5, 6]);
        let chunk_id = ChunkId::new(doc_id, hash);
        let rendered = chunk_id.to_string();
        assert_eq!(rendered, format!("{doc_id}:{hash}"));
        let parsed: ChunkId = rendered.parse().unwrap();
        assert_eq!(parsed, chunk_id);
    }
}
