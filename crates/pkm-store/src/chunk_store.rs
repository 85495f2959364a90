use std::path::{Path, PathBuf};

use pkm_core::{Chunk, DocId};

use crate::atomic::{read_whole, write_atomic};

/// One NDJSON file per document at `chunks/{doc_id}`, one chunk per line,
/// ordered by `chunk_index`. Writes are all-or-nothing per document; readers
/// never block writers.
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ChunkStore { root: root.into() }
    }

    pub fn path_for(&self, doc_id: &DocId) -> PathBuf {
        self.root.join(doc_id.to_string())
    }

    /// Overwrites the document's chunk file atomically. Re-chunking a
    /// document always goes through this, never an in-place edit.
    pub async fn write(&self, doc_id: &DocId, chunks: &[Chunk]) -> pkm_error::Result<()> {
        let mut body = String::new();
        for chunk in chunks {
            let line = serde_json::to_string(chunk).map_err(|e| {
                pkm_error::Error::LogicInvariant(format!("chunk failed to serialize: {e}"))
            })?;
            body.push_str(&line);
            body.push('\n');
        }
        write_atomic(&self.path_for(doc_id), body.as_bytes()).await
    }

    /// Yields chunks in insertion order (the file's line order).
    pub async fn read(&self, doc_id: &DocId) -> pkm_error::Result<Vec<Chunk>> {
        let path = self.path_for(doc_id);
        parse_ndjson(&read_whole(&path).await?, &path)
    }

    /// Yields every `(doc_id, chunk)` pair across the corpus. Files that
    /// don't parse as a `DocId` filename are skipped (not every entry under
    /// the chunk-store root need be ours, e.g. stray editor swap files).
    pub async fn iter_all(&self) -> pkm_error::Result<Vec<(DocId, Chunk)>> {
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Ok(doc_id) = name.parse::<DocId>() else {
                continue;
            };
            let chunks = self.read(&doc_id).await?;
            out.extend(chunks.into_iter().map(|c| (doc_id, c)));
        }

        Ok(out)
    }
}

fn parse_ndjson(bytes: &[u8], path: &Path) -> pkm_error::Result<Vec<Chunk>> {
    let text = std::str::from_utf8(bytes).map_err(|e| pkm_error::Error::InputMalformed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    text.lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| pkm_error::Error::InputMalformed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk(doc_id: DocId, index: u32) -> Chunk {
        Chunk {
            doc_id,
            chunk_hash: pkm_core::hash::chunk_hash(&format!("chunk {index}")),
            chunk_index: index,
            text: format!("chunk {index}"),
            tokens: 2,
            section: None,
            subsection: None,
            modality: "text".to_string(),
            language: "en".to_string(),
            page: None,
        }
    }

    #[tokio::test]
    async fn write_then_read_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());
        let doc_id = DocId::generate();
        let chunks = vec![sample_chunk(doc_id, 0), sample_chunk(doc_id, 1)];
        store.write(&doc_id, &chunks).await.unwrap();

        let read_back = store.read(&doc_id).await.unwrap();
        assert_eq!(read_back.len(), 2);
        assert_eq!(read_back[0].chunk_index, 0);
        assert_eq!(read_back[1].chunk_index, 1);
    }

    #[tokio::test]
    async fn rewrite_overwrites_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());
        let doc_id = DocId::generate();
        store.write(&doc_id, &[sample_chunk(doc_id, 0)]).await.unwrap();
        store
            .write(&doc_id, &[sample_chunk(doc_id, 0), sample_chunk(doc_id, 1)])
            .await
            .unwrap();

        let read_back = store.read(&doc_id).await.unwrap();
        assert_eq!(read_back.len(), 2);
    }

    #[tokio::test]
    async fn iter_all_covers_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());
        let doc_a = DocId::generate();
        let doc_b = DocId::generate();
        store.write(&doc_a, &[sample_chunk(doc_a, 0)]).await.unwrap();
        store.write(&doc_b, &[sample_chunk(doc_b, 0)]).await.unwrap();

        let all = store.iter_all().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn iter_all_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path().join("does-not-exist"));
        assert!(store.iter_all().await.unwrap().is_empty());
    }
}
