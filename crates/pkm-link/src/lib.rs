#![doc = r#"
pkm-link — wiki-link extraction, four-tier name resolution, and the
bidirectional link/backlink rebuild. A `Link` is the same shape whether it's
an outgoing link on the source document or a backlink on the target; only
which list it lives in distinguishes the two directions.
"#]

pub mod extract;
pub mod name_index;
pub mod rebuild;
pub mod resolve;

pub use extract::{extract_wikilinks, RawLink};
pub use name_index::NameIndex;
pub use rebuild::{rebuild_links, RebuildReport};
pub use resolve::{Resolution, ResolvedTarget};
