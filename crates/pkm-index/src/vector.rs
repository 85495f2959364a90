use std::collections::HashMap;

use pkm_core::{Chunk, ChunkHash, ChunkId};
use pkm_store::LoadedEmbeddings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticHit {
    pub chunk_id: ChunkId,
    pub score: f32,
}

/// Flat `N x dim` row-major matrix of L2-normalized embedding vectors, keyed
/// by `chunk_hash -> chunk_id` so query results can be reported at chunk
/// granularity. Immutable once built; a rebuild replaces the whole value
/// rather than mutating rows in place.
pub struct VectorIndex {
    hashes: Vec<ChunkHash>,
    matrix: Vec<f32>,
    dim: usize,
    chunk_ids: HashMap<ChunkHash, ChunkId>,
}

impl VectorIndex {
    pub fn empty() -> Self {
        VectorIndex {
            hashes: Vec::new(),
            matrix: Vec::new(),
            dim: 0,
            chunk_ids: HashMap::new(),
        }
    }

    /// Builds the index from a model's loaded (and already L2-normalized)
    /// embeddings plus the chunk corpus needed to resolve `chunk_hash` to the
    /// owning `chunk_id`. Hashes with no matching chunk (stale embeddings
    /// left behind by a deleted chunk) are dropped rather than indexed under
    /// a dangling id.
    pub fn build(loaded: LoadedEmbeddings, chunks: &[Chunk]) -> Self {
        let mut chunk_ids = HashMap::with_capacity(chunks.len());
        for chunk in chunks {
            chunk_ids.insert(chunk.chunk_hash, chunk.id());
        }

        let mut hashes = Vec::with_capacity(loaded.hashes.len());
        let mut matrix = Vec::with_capacity(loaded.data.len());
        for (row_idx, hash) in loaded.hashes.iter().enumerate() {
            if chunk_ids.contains_key(hash) {
                hashes.push(*hash);
                let row = &loaded.data[row_idx * loaded.dim..(row_idx + 1) * loaded.dim];
                matrix.extend_from_slice(row);
            }
        }

        VectorIndex {
            hashes,
            matrix,
            dim: loaded.dim,
            chunk_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// `s = M . (q / ||q||)`; ties broken by ascending row index, which is
    /// insertion order from `build` and therefore deterministic across runs
    /// given the same on-disk embedding set.
    pub fn semantic_search(&self, query: &[f32], limit: usize) -> Vec<SemanticHit> {
        if self.dim == 0 || query.len() != self.dim {
            return Vec::new();
        }
        let norm: f32 = query.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return Vec::new();
        }
        let normalized: Vec<f32> = query.iter().map(|x| x / norm).collect();

        let mut scored: Vec<(usize, f32)> = self
            .hashes
            .iter()
            .enumerate()
            .map(|(row_idx, _)| {
                let row = &self.matrix[row_idx * self.dim..(row_idx + 1) * self.dim];
                let dot: f32 = row.iter().zip(normalized.iter()).map(|(a, b)| a * b).sum();
                (row_idx, dot)
            })
            .collect();

        scored.sort_by(|(ia, sa), (ib, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| ia.cmp(ib))
        });
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(row_idx, score)| SemanticHit {
                chunk_id: self.chunk_ids[&self.hashes[row_idx]],
                score,
            })
            .collect()
    }
}
