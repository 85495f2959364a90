use std::collections::{HashMap, HashSet};

use pkm_core::{DocId, DocumentRecord};

use crate::resolve::{ResolvedTarget, Resolution};

/// Lookup index built once per rebuild from every loaded record's
/// `doc_id`/`slug`/`aliases`/`title`, so resolving N links costs N lookups
/// rather than N full scans of the record set.
pub struct NameIndex {
    ids: HashSet<DocId>,
    slug: HashMap<String, DocId>,
    alias_lower: HashMap<String, DocId>,
    title_lower: HashMap<String, DocId>,
}

impl NameIndex {
    pub fn build(records: &[DocumentRecord]) -> Self {
        let mut ids = HashSet::with_capacity(records.len());
        let mut slug = HashMap::with_capacity(records.len());
        let mut alias_lower = HashMap::new();
        let mut title_lower = HashMap::with_capacity(records.len());

        for record in records {
            ids.insert(record.doc_id);
            slug.insert(record.slug.clone(), record.doc_id);
            for alias in &record.aliases {
                alias_lower.insert(alias.to_lowercase(), record.doc_id);
            }
            title_lower.insert(record.title.to_lowercase(), record.doc_id);
        }

        NameIndex {
            ids,
            slug,
            alias_lower,
            title_lower,
        }
    }

    /// Four-tier resolution, first hit wins: exact ULID *that exists in the
    /// corpus*, slug (case-sensitive), alias (case-insensitive), title
    /// (case-insensitive). A syntactically valid ULID with no matching
    /// record falls through to the remaining tiers rather than resolving.
    pub fn resolve(&self, target: &str) -> ResolvedTarget {
        let target = target.trim();

        if let Ok(doc_id) = target.parse::<DocId>() {
            if self.ids.contains(&doc_id) {
                return ResolvedTarget {
                    doc_id: Some(doc_id),
                    resolution: Resolution::Id,
                };
            }
        }
        if let Some(doc_id) = self.slug.get(target) {
            return ResolvedTarget {
                doc_id: Some(*doc_id),
                resolution: Resolution::Slug,
            };
        }
        let lower = target.to_lowercase();
        if let Some(doc_id) = self.alias_lower.get(&lower) {
            return ResolvedTarget {
                doc_id: Some(*doc_id),
                resolution: Resolution::Alias,
            };
        }
        if let Some(doc_id) = self.title_lower.get(&lower) {
            return ResolvedTarget {
                doc_id: Some(*doc_id),
                resolution: Resolution::Title,
            };
        }

        ResolvedTarget {
            doc_id: None,
            resolution: Resolution::Unresolved,
        }
    }
}
