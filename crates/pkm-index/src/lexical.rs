use std::collections::HashSet;
use std::sync::RwLock;

use bm25::{EmbedderBuilder, Scorer, Tokenizer};
use lazy_static::lazy_static;
use pkm_core::ChunkId;
use regex::Regex;

lazy_static! {
    static ref WIKILINK: Regex = Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").unwrap();
}

/// Removes wiki-link syntax before indexing: `[[target]] -> ""`,
/// `[[target|display]] -> "display"`. Leaves the rest of the prose intact.
pub fn strip_wikilinks(text: &str) -> String {
    WIKILINK
        .replace_all(text, |caps: &regex::Captures| {
            caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default()
        })
        .into_owned()
}

/// Unicode-aware word splitting plus lowercasing. Markdown prose has no
/// camelCase or snake_case identifiers worth splitting further.
#[derive(Default, Clone)]
pub struct ProseTokenizer;

impl Tokenizer for ProseTokenizer {
    fn tokenize(&self, input_text: &str) -> Vec<String> {
        input_text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalHit {
    pub chunk_id: ChunkId,
    pub score: f32,
}

struct Inner {
    embedder: bm25::Embedder<u32, ProseTokenizer>,
    scorer: Scorer<ChunkId, u32>,
    ids: HashSet<ChunkId>,
}

/// BM25 lexical index over chunk text, keyed by `chunk_id`. `upsert`/`remove`
/// take the write side; `search` takes only a read lock, so a rebuild is the
/// only operation that blocks concurrent readers, and only for as long as the
/// final swap takes (the replacement index is built off to the side first).
pub struct LexicalIndex {
    inner: RwLock<Inner>,
}

impl LexicalIndex {
    pub fn new(avgdl: f32) -> Self {
        LexicalIndex {
            inner: RwLock::new(Inner {
                embedder: EmbedderBuilder::<u32, ProseTokenizer>::with_avgdl(avgdl).build(),
                scorer: Scorer::new(),
                ids: HashSet::new(),
            }),
        }
    }

    /// Idempotent by `chunk_id`: re-upserting the same id replaces its entry.
    pub fn upsert(&self, chunk_id: ChunkId, text: &str) {
        let stripped = strip_wikilinks(text);
        let mut inner = self.inner.write().unwrap();
        let embedding = inner.embedder.embed(&stripped);
        inner.scorer.upsert(&chunk_id, embedding);
        inner.ids.insert(chunk_id);
    }

    pub fn remove(&self, chunk_id: &ChunkId) {
        let mut inner = self.inner.write().unwrap();
        inner.scorer.remove(chunk_id);
        inner.ids.remove(chunk_id);
    }

    /// Full rebuild from a fresh corpus. The replacement embedder/scorer are
    /// built entirely before the write lock is taken, so the swap itself is
    /// the only moment readers are blocked.
    pub fn rebuild_from(&self, corpus: &[(ChunkId, String)]) {
        let total_tokens: usize = corpus
            .iter()
            .map(|(_, text)| ProseTokenizer.tokenize(&strip_wikilinks(text)).len())
            .sum();
        let avgdl = if corpus.is_empty() {
            0.0
        } else {
            total_tokens as f32 / corpus.len() as f32
        };

        let embedder = EmbedderBuilder::<u32, ProseTokenizer>::with_avgdl(avgdl).build();
        let mut scorer = Scorer::<ChunkId, u32>::new();
        let mut ids = HashSet::with_capacity(corpus.len());
        for (chunk_id, text) in corpus {
            let stripped = strip_wikilinks(text);
            let embedding = embedder.embed(&stripped);
            scorer.upsert(chunk_id, embedding);
            ids.insert(*chunk_id);
        }

        let mut inner = self.inner.write().unwrap();
        inner.embedder = embedder;
        inner.scorer = scorer;
        inner.ids = ids;
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<LexicalHit> {
        let inner = self.inner.read().unwrap();
        let qemb = inner.embedder.embed(query);
        let mut matches = inner.scorer.matches(&qemb);
        matches.truncate(limit);
        matches
            .into_iter()
            .map(|doc| LexicalHit {
                chunk_id: doc.id,
                score: doc.score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkm_core::{ChunkHash, DocId};

    fn cid(doc: DocId, seed: u8) -> ChunkId {
        ChunkId::new(doc, ChunkHash::from_bytes([seed; 6]))
    }

    #[test]
    fn strip_wikilinks_removes_target_keeps_display() {
        let text = "See [[other-doc]] and [[other-doc|the other doc]] for more.";
        let stripped = strip_wikilinks(text);
        assert_eq!(stripped, "See  and the other doc for more.");
    }

    #[test]
    fn upsert_then_search_finds_matching_chunk() {
        let index = LexicalIndex::new(10.0);
        let doc = DocId::generate();
        index.upsert(cid(doc, 1), "sourdough starter feeding schedule");
        index.upsert(cid(doc, 2), "tomato sauce reduction technique");

        let hits = index.search("sourdough", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, cid(doc, 1));
    }

    #[test]
    fn wikilink_targets_are_not_searchable() {
        let index = LexicalIndex::new(10.0);
        let doc = DocId::generate();
        index.upsert(cid(doc, 1), "this links to [[secret-target-name]] elsewhere");

        assert!(index.search("secret-target-name", 10).is_empty());
    }

    #[test]
    fn rebuild_from_replaces_prior_contents() {
        let index = LexicalIndex::new(10.0);
        let doc = DocId::generate();
        index.upsert(cid(doc, 1), "old content about kayaking");

        index.rebuild_from(&[(cid(doc, 2), "new content about beekeeping".to_string())]);

        assert!(index.search("kayaking", 10).is_empty());
        assert_eq!(index.search("beekeeping", 10)[0].chunk_id, cid(doc, 2));
    }

    #[test]
    fn remove_drops_a_chunk_from_results() {
        let index = LexicalIndex::new(10.0);
        let doc = DocId::generate();
        let id = cid(doc, 1);
        index.upsert(id, "unique phrase xenoblast");
        assert_eq!(index.search("xenoblast", 10).len(), 1);

        index.remove(&id);
        assert!(index.search("xenoblast", 10).is_empty());
    }
}
