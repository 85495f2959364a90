#![doc = r#"
pkm-rag — the hybrid search engine: lexical and semantic retrieval fused by
Reciprocal Rank Fusion, grouped so no single document can flood a result set,
with mode switching between hybrid/keyword/semantic.

This crate owns neither index: `pkm-index`'s `LexicalIndex` and `VectorIndex`
are built and rebuilt elsewhere, `HybridEngine` only holds the handles it's
given and queries them. Lexical and semantic retrieval are issued
concurrently via `tokio::join!`; an unavailable or timed-out embedding
provider degrades hybrid mode to keyword-only rather than failing the query.
"#]

pub mod engine;
pub mod fusion;

pub use engine::{
    build_chunk_meta, ChunkMeta, Hit, HybridEngine, NoopReranker, Reranker, SearchMode, SearchParams, Source,
};
pub use fusion::{group_by_document, rrf_fuse};
