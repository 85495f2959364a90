use std::path::PathBuf;

use pkm_core::{DocId, DocumentRecord};

use crate::atomic::{read_whole, write_atomic};

/// One JSON file per document at `metadata/{doc_id}.json`. Each record is
/// written via the same temp-file-then-rename primitive as the chunk and
/// embedding stores, so a reader always sees a complete record.
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        RecordStore { root: root.into() }
    }

    pub fn path_for(&self, doc_id: &DocId) -> PathBuf {
        self.root.join(format!("{doc_id}.json"))
    }

    pub async fn write(&self, record: &DocumentRecord) -> pkm_error::Result<()> {
        let body = serde_json::to_vec_pretty(record).map_err(|e| {
            pkm_error::Error::LogicInvariant(format!("record failed to serialize: {e}"))
        })?;
        write_atomic(&self.path_for(&record.doc_id), &body).await
    }

    pub async fn read(&self, doc_id: &DocId) -> pkm_error::Result<DocumentRecord> {
        let path = self.path_for(doc_id);
        let bytes = read_whole(&path).await?;
        serde_json::from_slice(&bytes).map_err(|e| pkm_error::Error::InputMalformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Loads every record in the store. A single malformed record is
    /// reported in the accompanying error list rather than aborting the
    /// whole load, matching the per-document error boundary.
    pub async fn load_all(&self) -> pkm_error::Result<(Vec<DocumentRecord>, Vec<pkm_error::Error>)> {
        let mut ok = Vec::new();
        let mut errors = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((ok, errors)),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            let Ok(doc_id) = stem.parse::<DocId>() else {
                continue;
            };
            match self.read(&doc_id).await {
                Ok(record) => ok.push(record),
                Err(e) => errors.push(e),
            }
        }

        Ok((ok, errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pkm_core::Status;

    fn sample_record(doc_id: DocId) -> DocumentRecord {
        DocumentRecord {
            doc_id,
            title: "Pizza Recipe".to_string(),
            tags: vec![],
            aliases: vec![],
            categories: vec![],
            language: "en".to_string(),
            created: Utc::now(),
            updated: Utc::now(),
            date_semantic: None,
            content_hash: "abc".to_string(),
            file_hash: "def".to_string(),
            status: Status::default(),
            links: vec![],
            backlinks: vec![],
            slug: "pizza-recipe".to_string(),
            word_count: 100,
        }
    }

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        let doc_id = DocId::generate();
        let record = sample_record(doc_id);
        store.write(&record).await.unwrap();

        let read_back = store.read(&doc_id).await.unwrap();
        assert_eq!(read_back.title, "Pizza Recipe");
    }

    #[tokio::test]
    async fn load_all_skips_malformed_and_reports_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        let good_id = DocId::generate();
        store.write(&sample_record(good_id)).await.unwrap();

        let bad_id = DocId::generate();
        tokio::fs::write(store.path_for(&bad_id), b"not json").await.unwrap();

        let (records, errors) = store.load_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(errors.len(), 1);
    }
}
