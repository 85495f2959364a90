#![doc = r#"
pkm-chunk — deterministic, hierarchy-aware markdown chunking.

Two passes: split on ATX headings to recover `section`/`subsection`, then
enforce a token budget per section by greedily packing paragraphs (falling
back to sentences for an oversized paragraph), retaining the last packed
element as overlap between consecutive chunks. Byte-for-byte input always
produces byte-for-byte identical chunks; chunk identity is downstream of
that determinism, not the other way around.

Non-UTF-8 input is rejected before it reaches this crate — callers hold a
`&str`, which is already a proof of valid UTF-8; the "malformed input" error
kind belongs to whichever store read the bytes off disk.
"#]

mod hierarchical;

pub use hierarchical::{chunk_document, HierarchicalChunker};
