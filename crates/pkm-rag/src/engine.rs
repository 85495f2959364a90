use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use pkm_core::{Chunk, ChunkId, DocId};
use pkm_embed::EmbeddingProvider;
use pkm_index::{LexicalHit, LexicalIndex, SemanticHit, VectorIndex};
use tracing::instrument;

use crate::fusion::{group_by_document, rrf_fuse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Hybrid,
    Keyword,
    Semantic,
}

/// Tunables for a single `HybridEngine::search` call. `rrf_k` and
/// `group_limit` only affect hybrid mode's fusion step; keyword and semantic
/// modes still apply `group_limit` to their own single-list ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub mode: SearchMode,
    pub k: usize,
    pub max_keyword_hits: usize,
    pub max_semantic_hits: usize,
    pub rrf_k: f64,
    pub group_limit: usize,
    pub semantic_timeout: Duration,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            mode: SearchMode::Hybrid,
            k: 10,
            max_keyword_hits: 50,
            max_semantic_hits: 50,
            rrf_k: 60.0,
            group_limit: 3,
            semantic_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Keyword,
    Semantic,
    Hybrid,
}

/// One search result. `text` is populated for hybrid and keyword hits, not
/// semantic-only ones — a caller doing a pure similarity sweep is expected to
/// already hold the chunk bodies locally and fetch on demand.
#[derive(Debug, Clone)]
pub struct Hit {
    pub chunk_id: ChunkId,
    pub doc_id: DocId,
    pub rrf_score: Option<f64>,
    pub bm25: Option<f32>,
    pub semantic: Option<f32>,
    pub source: Source,
    pub section: Option<String>,
    pub chunk_index: u32,
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChunkMeta {
    pub doc_id: DocId,
    pub section: Option<String>,
    pub chunk_index: u32,
    pub text: String,
}

/// Builds the `chunk_id -> metadata` lookup a `HybridEngine` needs to turn a
/// bare ranked id list back into a displayable `Hit`. Callers typically load
/// the full chunk corpus once (via `pkm_store::ChunkStore::iter_all`) and
/// pass it straight through here.
pub fn build_chunk_meta(chunks: &[Chunk]) -> HashMap<ChunkId, ChunkMeta> {
    chunks
        .iter()
        .map(|c| {
            (
                c.id(),
                ChunkMeta {
                    doc_id: c.doc_id,
                    section: c.section.clone(),
                    chunk_index: c.chunk_index,
                    text: c.text.clone(),
                },
            )
        })
        .collect()
}

/// Extension seam for a downstream reordering pass (cross-encoder, MMR
/// diversity, whatever). The RRF + grouping pipeline above never depends on a
/// non-trivial implementation of this trait.
pub trait Reranker: Send + Sync {
    fn rerank(&self, query: &str, hits: Vec<Hit>) -> pkm_error::Result<Vec<Hit>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReranker;

impl Reranker for NoopReranker {
    fn rerank(&self, _query: &str, hits: Vec<Hit>) -> pkm_error::Result<Vec<Hit>> {
        Ok(hits)
    }
}

/// Wires a lexical index, a vector index, and a query-time embedding provider
/// into the fused hybrid/keyword/semantic search surface. Owns none of the
/// indexes' lifecycles — rebuilding either one is the caller's job; this just
/// queries whatever handle it's given.
pub struct HybridEngine {
    lexical: Arc<LexicalIndex>,
    vector: Arc<VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
    chunk_meta: HashMap<ChunkId, ChunkMeta>,
    reranker: Arc<dyn Reranker>,
}

impl HybridEngine {
    pub fn new(
        lexical: Arc<LexicalIndex>,
        vector: Arc<VectorIndex>,
        provider: Arc<dyn EmbeddingProvider>,
        chunk_meta: HashMap<ChunkId, ChunkMeta>,
    ) -> Self {
        HybridEngine {
            lexical,
            vector,
            provider,
            chunk_meta,
            reranker: Arc::new(NoopReranker),
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    fn meta(&self, id: &ChunkId) -> Option<&ChunkMeta> {
        self.chunk_meta.get(id)
    }

    #[instrument(skip(self, query), fields(mode = ?params.mode, k = params.k))]
    pub async fn search(&self, query: &str, params: &SearchParams) -> pkm_error::Result<Vec<Hit>> {
        let hits = match params.mode {
            SearchMode::Keyword => self.search_keyword(query, params),
            SearchMode::Semantic => self.search_semantic(query, params).await,
            SearchMode::Hybrid => self.search_hybrid(query, params).await,
        };
        self.reranker.rerank(query, hits)
    }

    fn keyword_hits(&self, query: &str, limit: usize) -> Vec<LexicalHit> {
        self.lexical.search(query, limit)
    }

    /// Embeds `query` with a bounded timeout, then runs the semantic search.
    /// A timed-out, errored, or zero-length embedding is treated the same way
    /// as "no semantic results" — the caller decides whether that means an
    /// empty result set (semantic-only mode) or a fallback to keyword-only
    /// (hybrid mode).
    async fn semantic_hits(&self, query: &str, params: &SearchParams) -> Vec<SemanticHit> {
        let embed_fut = self.provider.embed_batch(&[query]);
        let embedding = match tokio::time::timeout(params.semantic_timeout, embed_fut).await {
            Ok(Ok(mut batch)) if !batch.is_empty() && !batch[0].is_empty() => batch.remove(0),
            Ok(Ok(_)) => return Vec::new(),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "embedding provider returned an error, degrading");
                return Vec::new();
            }
            Err(_) => {
                tracing::debug!("embedding provider timed out, degrading");
                return Vec::new();
            }
        };
        self.vector.semantic_search(&embedding, params.max_semantic_hits)
    }

    fn build_keyword_hits(&self, lexical_hits: Vec<LexicalHit>) -> Vec<Hit> {
        lexical_hits
            .into_iter()
            .filter_map(|lh| {
                self.meta(&lh.chunk_id).map(|meta| Hit {
                    chunk_id: lh.chunk_id,
                    doc_id: meta.doc_id,
                    rrf_score: None,
                    bm25: Some(lh.score),
                    semantic: None,
                    source: Source::Keyword,
                    section: meta.section.clone(),
                    chunk_index: meta.chunk_index,
                    text: Some(meta.text.clone()),
                })
            })
            .collect()
    }

    fn search_keyword(&self, query: &str, params: &SearchParams) -> Vec<Hit> {
        let lexical_hits = self.keyword_hits(query, params.max_keyword_hits);
        let hits = self.build_keyword_hits(lexical_hits);
        group_by_document(hits, |h| h.doc_id, params.group_limit, params.k)
    }

    async fn search_semantic(&self, query: &str, params: &SearchParams) -> Vec<Hit> {
        let semantic_hits = self.semantic_hits(query, params).await;
        let hits: Vec<Hit> = semantic_hits
            .into_iter()
            .filter_map(|sh| {
                self.meta(&sh.chunk_id).map(|meta| Hit {
                    chunk_id: sh.chunk_id,
                    doc_id: meta.doc_id,
                    rrf_score: None,
                    bm25: None,
                    semantic: Some(sh.score),
                    source: Source::Semantic,
                    section: meta.section.clone(),
                    chunk_index: meta.chunk_index,
                    text: None,
                })
            })
            .collect();
        group_by_document(hits, |h| h.doc_id, params.group_limit, params.k)
    }

    /// Lexical and semantic retrieval are issued concurrently. If the
    /// embedding side degrades to nothing (provider unavailable, timed out,
    /// or returned a zero-length vector), this falls through to a
    /// keyword-only result rather than returning nothing — hybrid mode never
    /// degrades the other direction, into semantic-only.
    async fn search_hybrid(&self, query: &str, params: &SearchParams) -> Vec<Hit> {
        let lexical_fut = std::future::ready(self.keyword_hits(query, params.max_keyword_hits));
        let semantic_fut = self.semantic_hits(query, params);
        let (lexical_hits, semantic_hits) = tokio::join!(lexical_fut, semantic_fut);

        if semantic_hits.is_empty() {
            let hits = self.build_keyword_hits(lexical_hits);
            return group_by_document(hits, |h| h.doc_id, params.group_limit, params.k);
        }

        let lexical_ids: Vec<ChunkId> = lexical_hits.iter().map(|h| h.chunk_id).collect();
        let semantic_ids: Vec<ChunkId> = semantic_hits.iter().map(|h| h.chunk_id).collect();
        let fused = rrf_fuse(&lexical_ids, &semantic_ids, params.rrf_k);

        let bm25_scores: HashMap<ChunkId, f32> = lexical_hits.into_iter().map(|h| (h.chunk_id, h.score)).collect();
        let semantic_scores: HashMap<ChunkId, f32> = semantic_hits.into_iter().map(|h| (h.chunk_id, h.score)).collect();
        let lexical_present: HashSet<ChunkId> = lexical_ids.into_iter().collect();
        let semantic_present: HashSet<ChunkId> = semantic_ids.into_iter().collect();

        let hits: Vec<Hit> = fused
            .into_iter()
            .filter_map(|(chunk_id, rrf_score)| {
                self.meta(&chunk_id).map(|meta| {
                    let in_lex = lexical_present.contains(&chunk_id);
                    let in_sem = semantic_present.contains(&chunk_id);
                    let source = if in_lex && in_sem {
                        Source::Hybrid
                    } else if in_lex {
                        Source::Keyword
                    } else {
                        Source::Semantic
                    };
                    Hit {
                        chunk_id,
                        doc_id: meta.doc_id,
                        rrf_score: Some(rrf_score),
                        bm25: bm25_scores.get(&chunk_id).copied(),
                        semantic: semantic_scores.get(&chunk_id).copied(),
                        source,
                        section: meta.section.clone(),
                        chunk_index: meta.chunk_index,
                        text: Some(meta.text.clone()),
                    }
                })
            })
            .collect();

        group_by_document(hits, |h| h.doc_id, params.group_limit, params.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkm_embed::NullEmbeddingProvider;
    use pkm_store::LoadedEmbeddings;

    fn sample_chunk(doc: DocId, text: &str, index: u32) -> Chunk {
        Chunk {
            doc_id: doc,
            chunk_hash: pkm_core::hash::chunk_hash(text),
            chunk_index: index,
            text: text.to_string(),
            tokens: 4,
            section: Some("Recipe".to_string()),
            subsection: None,
            modality: "text".to_string(),
            language: "en".to_string(),
            page: None,
        }
    }

    fn build_engine(chunks: &[Chunk]) -> HybridEngine {
        let lexical = LexicalIndex::new(10.0);
        lexical.rebuild_from(
            &chunks
                .iter()
                .map(|c| (c.id(), c.text.clone()))
                .collect::<Vec<_>>(),
        );

        let vector = VectorIndex::build(
            LoadedEmbeddings {
                hashes: Vec::new(),
                data: Vec::new(),
                dim: 0,
            },
            chunks,
        );

        let provider: Arc<dyn EmbeddingProvider> = Arc::new(NullEmbeddingProvider::new("null", 8));
        let chunk_meta = build_chunk_meta(chunks);
        HybridEngine::new(Arc::new(lexical), Arc::new(vector), provider, chunk_meta)
    }

    #[tokio::test]
    async fn hybrid_mode_degrades_to_keyword_only_when_provider_unavailable() {
        let doc = DocId::generate();
        let chunks = vec![sample_chunk(doc, "sourdough starter feeding schedule", 0)];
        let engine = build_engine(&chunks);

        let params = SearchParams::default();
        let hits = engine.search("sourdough", &params).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, Source::Keyword);
        assert!(hits[0].text.is_some());
    }

    #[tokio::test]
    async fn keyword_mode_never_touches_the_embedding_provider() {
        let doc = DocId::generate();
        let chunks = vec![sample_chunk(doc, "sourdough starter feeding schedule", 0)];
        let engine = build_engine(&chunks);

        let params = SearchParams {
            mode: SearchMode::Keyword,
            ..SearchParams::default()
        };
        let hits = engine.search("sourdough", &params).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].bm25.is_some(), true);
        assert!(hits[0].semantic.is_none());
    }

    #[tokio::test]
    async fn semantic_mode_with_unavailable_provider_returns_empty() {
        let doc = DocId::generate();
        let chunks = vec![sample_chunk(doc, "sourdough starter feeding schedule", 0)];
        let engine = build_engine(&chunks);

        let params = SearchParams {
            mode: SearchMode::Semantic,
            ..SearchParams::default()
        };
        let hits = engine.search("sourdough", &params).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn scenario_s2_grouping_caps_hits_per_document() {
        let doc_a = DocId::generate();
        let doc_b = DocId::generate();
        let mut chunks = Vec::new();
        for i in 0..6 {
            chunks.push(sample_chunk(doc_a, &format!("pizza dough recipe step {i}"), i));
        }
        chunks.push(sample_chunk(doc_b, "pizza dough recipe from a different document", 0));

        let engine = build_engine(&chunks);
        let params = SearchParams {
            mode: SearchMode::Keyword,
            k: 10,
            group_limit: 3,
            ..SearchParams::default()
        };
        let hits = engine.search("pizza dough recipe", &params).await.unwrap();

        let from_a = hits.iter().filter(|h| h.doc_id == doc_a).count();
        assert!(from_a <= 3, "expected at most 3 hits from doc_a, got {from_a}");
        assert!(hits.iter().any(|h| h.doc_id == doc_b));
    }

    #[tokio::test]
    async fn noop_reranker_is_a_passthrough() {
        let doc = DocId::generate();
        let chunks = vec![sample_chunk(doc, "sourdough starter feeding schedule", 0)];
        let engine = build_engine(&chunks).with_reranker(Arc::new(NoopReranker));

        let hits = engine.search("sourdough", &SearchParams::default()).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
