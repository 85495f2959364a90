use std::path::PathBuf;

use pkm_core::ChunkHash;

use crate::atomic::{read_whole, write_atomic};

/// Vectors for one model, loaded and L2-normalized. `dim` is implicit in
/// every on-disk file's length (`file_size / 4`); a mismatch across files in
/// the same model directory is a fatal [`pkm_error::Error::LogicInvariant`].
pub struct LoadedEmbeddings {
    pub hashes: Vec<ChunkHash>,
    /// Row-major, `hashes.len() * dim` floats, each row L2-normalized.
    pub data: Vec<f32>,
    pub dim: usize,
}

/// One little-endian float32 vector file per `(model, chunk_hash)` at
/// `embeddings/{model}/{chunk_hash}`.
pub struct EmbeddingStore {
    root: PathBuf,
}

impl EmbeddingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        EmbeddingStore { root: root.into() }
    }

    pub fn vector_path(&self, model: &str, chunk_hash: &ChunkHash) -> PathBuf {
        self.root.join(model).join(chunk_hash.to_string())
    }

    pub async fn has(&self, model: &str, chunk_hash: &ChunkHash) -> bool {
        tokio::fs::metadata(self.vector_path(model, chunk_hash))
            .await
            .is_ok()
    }

    /// Of `hashes`, returns the subset with no vector file yet for `model` —
    /// exactly the set the incremental embedder needs to call `embed_fn` on.
    pub async fn missing(&self, model: &str, hashes: &[ChunkHash]) -> Vec<ChunkHash> {
        let mut missing = Vec::new();
        for hash in hashes {
            if !self.has(model, hash).await {
                missing.push(*hash);
            }
        }
        missing
    }

    pub async fn put(&self, model: &str, chunk_hash: &ChunkHash, vector: &[f32]) -> pkm_error::Result<()> {
        let bytes: Vec<u8> = vector.iter().flat_map(|f| f.to_le_bytes()).collect();
        write_atomic(&self.vector_path(model, chunk_hash), &bytes).await
    }

    /// Loads every vector for `model`, L2-normalizing each row; zero vectors
    /// are preserved as-is (their cosine similarity with anything is 0).
    pub async fn load_all(&self, model: &str) -> pkm_error::Result<LoadedEmbeddings> {
        let model_dir = self.root.join(model);
        let mut entries = match tokio::fs::read_dir(&model_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadedEmbeddings {
                    hashes: Vec::new(),
                    data: Vec::new(),
                    dim: 0,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut hashes = Vec::new();
        let mut rows: Vec<Vec<f32>> = Vec::new();
        let mut dim: Option<usize> = None;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Ok(chunk_hash) = name.parse::<ChunkHash>() else {
                continue;
            };

            let bytes = read_whole(&entry.path()).await?;
            if bytes.len() % 4 != 0 {
                return Err(pkm_error::Error::LogicInvariant(format!(
                    "embedding file {} has a byte length not divisible by 4",
                    entry.path().display()
                )));
            }
            let row_dim = bytes.len() / 4;
            match dim {
                None => dim = Some(row_dim),
                Some(expected) if expected != row_dim => {
                    return Err(pkm_error::Error::LogicInvariant(format!(
                        "dimension mismatch in model '{model}': expected {expected}, found {row_dim} in {}",
                        entry.path().display()
                    )))
                }
                _ => {}
            }

            let mut row: Vec<f32> = bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            normalize_in_place(&mut row);

            hashes.push(chunk_hash);
            rows.push(row);
        }

        let dim = dim.unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            data.extend(row);
        }

        Ok(LoadedEmbeddings { hashes, data, dim })
    }
}

fn normalize_in_place(row: &mut [f32]) {
    let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in row.iter_mut() {
            *x /= norm;
        }
    }
}
