#![doc = r#"
pkm-index — the two retrieval indexes the hybrid search engine fuses: a BM25
lexical index over chunk text, and a flat in-memory cosine vector index over
chunk embeddings. Neither index persists itself; both are cheap enough to
rebuild wholesale from `pkm-store` on startup or on demand.
"#]

pub mod lexical;
pub mod vector;

pub use lexical::{strip_wikilinks, LexicalHit, LexicalIndex, ProseTokenizer};
pub use vector::{SemanticHit, VectorIndex};
