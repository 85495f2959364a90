use std::sync::Arc;
use std::sync::Mutex;

use pkm_core::ChunkHash;
use pkm_store::{ChunkStore, EmbeddingStore};

use crate::cache::BoundedCache;
use crate::provider::EmbeddingProvider;

const TEXT_CACHE_CAPACITY: usize = 1024;

/// Drives incremental embedding: enumerates chunk hashes from the chunk
/// store, asks the embedding store which are missing for the active model,
/// calls the provider on exactly those, and persists the results. Existing
/// vector files are never re-read or re-written.
pub struct IncrementalEmbedder<P: EmbeddingProvider> {
    chunk_store: ChunkStore,
    embedding_store: EmbeddingStore,
    provider: P,
    text_cache: Mutex<BoundedCache<ChunkHash, Vec<f32>>>,
}

pub struct EmbedRunReport {
    pub model: String,
    pub already_present: usize,
    pub newly_embedded: usize,
    pub provider_calls: usize,
}

impl<P: EmbeddingProvider> IncrementalEmbedder<P> {
    pub fn new(chunk_store: ChunkStore, embedding_store: EmbeddingStore, provider: P) -> Self {
        IncrementalEmbedder {
            chunk_store,
            embedding_store,
            provider,
            text_cache: Mutex::new(BoundedCache::new(TEXT_CACHE_CAPACITY)),
        }
    }

    /// Embeds every chunk hash across the corpus missing from the active
    /// model's directory. Re-chunking a single paragraph costs exactly one
    /// provider call because only that paragraph's hash is new.
    pub async fn embed_missing(&self) -> pkm_error::Result<EmbedRunReport> {
        let all_chunks = self.chunk_store.iter_all().await?;
        let model = self.provider.model_name().to_string();

        let all_hashes: Vec<ChunkHash> = all_chunks.iter().map(|(_, c)| c.chunk_hash).collect();
        let missing = self.embedding_store.missing(&model, &all_hashes).await;
        let already_present = all_hashes.len() - missing.len();

        if missing.is_empty() {
            return Ok(EmbedRunReport {
                model,
                already_present,
                newly_embedded: 0,
                provider_calls: 0,
            });
        }

        let mut to_call: Vec<(ChunkHash, &str)> = Vec::new();
        let mut cached: Vec<(ChunkHash, Vec<f32>)> = Vec::new();

        for hash in &missing {
            let cached_vector = { self.text_cache.lock().unwrap().get(hash).cloned() };
            match cached_vector {
                Some(vector) => cached.push((*hash, vector)),
                None => {
                    let text = all_chunks
                        .iter()
                        .find(|(_, c)| &c.chunk_hash == hash)
                        .map(|(_, c)| c.text.as_str())
                        .unwrap_or("");
                    to_call.push((*hash, text));
                }
            }
        }

        let texts: Vec<&str> = to_call.iter().map(|(_, t)| *t).collect();
        let provider_calls = if texts.is_empty() { 0 } else { 1 };
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.provider.embed_batch(&texts).await?
        };

        for ((hash, _), vector) in to_call.iter().zip(vectors.iter()) {
            if !vector.is_empty() {
                self.embedding_store.put(&model, hash, vector).await?;
                self.text_cache.lock().unwrap().insert(*hash, vector.clone());
            }
        }
        for (hash, vector) in &cached {
            self.embedding_store.put(&model, hash, vector).await?;
        }

        Ok(EmbedRunReport {
            model,
            already_present,
            newly_embedded: to_call.len() + cached.len(),
            provider_calls,
        })
    }
}

pub type SharedIncrementalEmbedder<P> = Arc<IncrementalEmbedder<P>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::NullEmbeddingProvider;
    use pkm_core::{Chunk, DocId};

    fn sample_chunk(doc_id: DocId, text: &str, index: u32) -> Chunk {
        Chunk {
            doc_id,
            chunk_hash: pkm_core::hash::chunk_hash(text),
            chunk_index: index,
            text: text.to_string(),
            tokens: 2,
            section: None,
            subsection: None,
            modality: "text".to_string(),
            language: "en".to_string(),
            page: None,
        }
    }

    #[tokio::test]
    async fn embed_missing_skips_already_present_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let chunk_store = ChunkStore::new(dir.path().join("chunks"));
        let embedding_store = EmbeddingStore::new(dir.path().join("embeddings"));
        let doc_id = DocId::generate();
        let chunk = sample_chunk(doc_id, "hello world", 0);
        chunk_store.write(&doc_id, &[chunk.clone()]).await.unwrap();

        // An embedding provider that returns non-empty vectors so `put` runs.
        struct Fixed;
        #[async_trait::async_trait]
        impl EmbeddingProvider for Fixed {
            async fn embed_batch(&self, texts: &[&str]) -> pkm_error::Result<Vec<Vec<f32>>> {
                Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
            }
            fn model_name(&self) -> &str {
                "fixed"
            }
            fn dimension(&self) -> usize {
                2
            }
        }

        let embedder = IncrementalEmbedder::new(chunk_store, embedding_store, Fixed);
        let report = embedder.embed_missing().await.unwrap();
        assert_eq!(report.newly_embedded, 1);
        assert_eq!(report.provider_calls, 1);

        let report2 = embedder.embed_missing().await.unwrap();
        assert_eq!(report2.newly_embedded, 0);
        assert_eq!(report2.already_present, 1);
        assert_eq!(report2.provider_calls, 0);
    }

    #[tokio::test]
    async fn null_provider_leaves_chunks_unembedded() {
        let dir = tempfile::tempdir().unwrap();
        let chunk_store = ChunkStore::new(dir.path().join("chunks"));
        let embedding_store = EmbeddingStore::new(dir.path().join("embeddings"));
        let doc_id = DocId::generate();
        chunk_store
            .write(&doc_id, &[sample_chunk(doc_id, "hello world", 0)])
            .await
            .unwrap();

        let embedder = IncrementalEmbedder::new(chunk_store, embedding_store, NullEmbeddingProvider::new("null", 8));
        let report = embedder.embed_missing().await.unwrap();
        assert_eq!(report.provider_calls, 1);
    }
}
