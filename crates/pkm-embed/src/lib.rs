#![doc = r#"
pkm-embed — the external embedding-provider boundary and the incremental
driver that keeps a vault's vector store in sync with its chunk store.

The core retrieval engine never talks to a provider directly; it depends
only on the `EmbeddingProvider` trait, so the HTTP backend, a future local
backend, or the null backend used in tests are all interchangeable.
"#]

pub mod cache;
pub mod incremental;
pub mod provider;

pub use cache::BoundedCache;
pub use incremental::{EmbedRunReport, IncrementalEmbedder};
pub use provider::{EmbeddingProvider, HttpEmbeddingProvider, NullEmbeddingProvider};
