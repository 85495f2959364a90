#![doc = r#"
pkm-core — canonical data types shared by every crate in the workspace.

Holds the identity types (`DocId`, `ChunkHash`, `ChunkId`), the closed record
schema (`Chunk`, `DocumentRecord`, `Link`, `LinkType`, `Status`), and the
hashing/token-counting primitives chunk identity is built on. Nothing here
touches the filesystem, an index, or a network call; those live in the
downstream crates that depend on this one.
"#]

pub mod hash;
pub mod ids;
pub mod model;
pub mod tokens;

pub use hash::{chunk_hash, sha256_hex};
pub use ids::{ChunkHash, ChunkId, DocId, IdError};
pub use model::{Chunk, DocumentRecord, Link, LinkType, Status};
