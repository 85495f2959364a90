#![doc = r#"
pkm-store — content-addressed persistence for chunks, embeddings, and
document records, all built on one atomic write primitive.

Every store here writes a destination file wholesale: a temp file is
written and fsynced in the same directory, then renamed over the
destination. No store ever opens a file for in-place editing, so a reader
observes either the previous complete file or the new one, never a partial
write (`atomic::write_atomic`).
"#]

pub mod atomic;
pub mod chunk_store;
pub mod embedding_store;
pub mod record_store;

pub use atomic::write_atomic;
pub use chunk_store::ChunkStore;
pub use embedding_store::{EmbeddingStore, LoadedEmbeddings};
pub use record_store::RecordStore;
