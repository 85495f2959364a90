use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChunkHash, ChunkId, DocId};

/// A contiguous substring of a document's body, content-addressed by
/// [`ChunkHash`]. See [`Chunk::id`] for the derived [`ChunkId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: DocId,
    pub chunk_hash: ChunkHash,
    pub chunk_index: u32,
    pub text: String,
    pub tokens: usize,
    pub section: Option<String>,
    pub subsection: Option<String>,
    #[serde(default = "default_modality")]
    pub modality: String,
    pub language: String,
    /// Reserved for forward compatibility; never populated by the chunker today.
    #[serde(default)]
    pub page: Option<u32>,
}

fn default_modality() -> String {
    "text".to_string()
}

impl Chunk {
    pub fn id(&self) -> ChunkId {
        ChunkId::new(self.doc_id, self.chunk_hash)
    }
}

/// `type ∈ {id, slug, alias, title}`; unresolved links default to `Slug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Id,
    Slug,
    Alias,
    Title,
}

impl Default for LinkType {
    fn default() -> Self {
        LinkType::Slug
    }
}

/// One wiki-link, either outgoing (on the linking document) or a backlink
/// (on the target document, with `target` pointing back at the linker).
/// Both directions share this shape; only which list a `Link` lives in
/// (`DocumentRecord::links` vs `DocumentRecord::backlinks`) distinguishes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub raw: String,
    #[serde(rename = "type")]
    pub link_type: LinkType,
    pub target: Option<DocId>,
    pub resolved: bool,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub relevance_score: f64,
    pub archived: bool,
    pub consolidated_into: Option<DocId>,
    pub human_edited: bool,
    #[serde(default)]
    pub agent_reviewed: bool,
}

impl Default for Status {
    fn default() -> Self {
        Status {
            relevance_score: 0.0,
            archived: false,
            consolidated_into: None,
            human_edited: false,
            agent_reviewed: false,
        }
    }
}

/// The one closed schema for a document's persisted metadata record.
/// Everything downstream of `pkm-store`'s record loader consumes this type;
/// nothing parses raw JSON again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub doc_id: DocId,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub language: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub date_semantic: Option<DateTime<Utc>>,
    pub content_hash: String,
    pub file_hash: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub backlinks: Vec<Link>,
    /// Slug derived from `title` at write time; stored so link resolution
    /// tier 2 (slug match) never has to re-derive it from `title`.
    pub slug: String,
    /// Outgoing-link count and word count, cached for the relevance scorer's
    /// quality component so it doesn't need the full chunk store in hand.
    #[serde(default)]
    pub word_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_is_doc_id_colon_chunk_hash() {
        let doc_id = DocId::generate();
        let hash = ChunkHash::from_bytes([0, 1, 2, 3, 4, 5]);
        let chunk = Chunk {
            doc_id,
            chunk_hash: hash,
            chunk_index: 0,
            text: "hello".to_string(),
            tokens: 1,
            section: None,
            subsection: None,
            modality: "text".to_string(),
            language: "en".to_string(),
            page: None,
        };
        assert_eq!(chunk.id(), ChunkId::new(doc_id, hash));
    }

    #[test]
    fn unresolved_link_defaults_to_slug_type() {
        assert_eq!(LinkType::default(), LinkType::Slug);
    }

    #[test]
    fn status_default_has_zero_score_and_not_archived() {
        let status = Status::default();
        assert_eq!(status.relevance_score, 0.0);
        assert!(!status.archived);
    }
}
