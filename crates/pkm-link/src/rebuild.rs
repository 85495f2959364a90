use pkm_core::{DocId, DocumentRecord, Link, LinkType};

use crate::extract::extract_wikilinks;
use crate::name_index::NameIndex;
use crate::resolve::Resolution;

pub struct RebuildReport {
    pub total_links: usize,
    pub broken_links: usize,
}

/// Rebuilds every document's `links` and `backlinks` from scratch against the
/// full corpus and its body text. Idempotent: running it twice on unchanged
/// input produces byte-identical link lists. `bodies` must supply one entry
/// per record in `records`, in the same order, since `DocumentRecord` does
/// not itself carry the document body.
pub fn rebuild_links(records: &mut [DocumentRecord], bodies: &[String]) -> RebuildReport {
    assert_eq!(records.len(), bodies.len(), "one body per record is required");

    let index = NameIndex::build(records);

    for record in records.iter_mut() {
        record.links.clear();
        record.backlinks.clear();
    }

    let mut total_links = 0usize;
    let mut broken_links = 0usize;
    let mut pending_backlinks: Vec<(DocId, Link)> = Vec::new();

    for (record, body) in records.iter_mut().zip(bodies.iter()) {
        for raw in extract_wikilinks(body) {
            let resolved = index.resolve(&raw.target);
            let resolved_ok = resolved.doc_id.is_some();
            if !resolved_ok {
                broken_links += 1;
                tracing::warn!(doc_id = %record.doc_id, raw = %raw.raw, "broken wiki-link");
            }

            let link_type = match resolved.resolution {
                Resolution::Id => LinkType::Id,
                Resolution::Slug => LinkType::Slug,
                Resolution::Alias => LinkType::Alias,
                Resolution::Title => LinkType::Title,
                Resolution::Unresolved => LinkType::Slug,
            };

            let link = Link {
                raw: raw.raw,
                link_type,
                target: resolved.doc_id,
                resolved: resolved_ok,
                context: raw.context,
            };

            if let Some(target_doc) = resolved.doc_id {
                pending_backlinks.push((
                    target_doc,
                    Link {
                        raw: link.raw.clone(),
                        link_type: link.link_type,
                        target: Some(record.doc_id),
                        resolved: true,
                        context: link.context.clone(),
                    },
                ));
            }

            record.links.push(link);
            total_links += 1;
        }
    }

    for (target_doc, backlink) in pending_backlinks {
        if let Some(target_record) = records.iter_mut().find(|r| r.doc_id == target_doc) {
            target_record.backlinks.push(backlink);
        }
    }

    RebuildReport {
        total_links,
        broken_links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pkm_core::Status;

    fn record(doc_id: DocId, title: &str, slug: &str) -> DocumentRecord {
        DocumentRecord {
            doc_id,
            title: title.to_string(),
            tags: vec![],
            aliases: vec![],
            categories: vec![],
            language: "en".to_string(),
            created: Utc::now(),
            updated: Utc::now(),
            date_semantic: None,
            content_hash: "x".to_string(),
            file_hash: "y".to_string(),
            status: Status::default(),
            links: vec![],
            backlinks: vec![],
            slug: slug.to_string(),
            word_count: 0,
        }
    }

    #[test]
    fn resolved_link_produces_a_backlink_on_the_target() {
        let doc_a = DocId::generate();
        let doc_b = DocId::generate();
        let mut records = vec![record(doc_a, "Doc A", "doc-a"), record(doc_b, "Doc B", "doc-b")];
        let bodies = vec!["links to [[doc-b]]".to_string(), "no links here".to_string()];

        let report = rebuild_links(&mut records, &bodies);
        assert_eq!(report.total_links, 1);
        assert_eq!(report.broken_links, 0);

        assert_eq!(records[0].links.len(), 1);
        assert!(records[0].links[0].resolved);
        assert_eq!(records[1].backlinks.len(), 1);
        assert_eq!(records[1].backlinks[0].target, Some(doc_a));
    }

    #[test]
    fn unresolved_link_is_retained_with_slug_type_and_no_target() {
        let doc_a = DocId::generate();
        let mut records = vec![record(doc_a, "Doc A", "doc-a")];
        let bodies = vec!["links to [[nonexistent-doc]]".to_string()];

        let report = rebuild_links(&mut records, &bodies);
        assert_eq!(report.broken_links, 1);
        assert!(!records[0].links[0].resolved);
        assert_eq!(records[0].links[0].target, None);
        assert_eq!(records[0].links[0].link_type, LinkType::Slug);
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let doc_a = DocId::generate();
        let doc_b = DocId::generate();
        let mut records = vec![record(doc_a, "Doc A", "doc-a"), record(doc_b, "Doc B", "doc-b")];
        let bodies = vec!["links to [[doc-b]]".to_string(), "no links here".to_string()];

        rebuild_links(&mut records, &bodies);
        let first_pass = records.clone();
        rebuild_links(&mut records, &bodies);
        assert_eq!(records, first_pass);
    }

    #[test]
    fn rebuild_clears_stale_links_from_a_prior_pass() {
        let doc_a = DocId::generate();
        let mut records = vec![record(doc_a, "Doc A", "doc-a")];
        rebuild_links(&mut records, &["links to [[missing]]".to_string()]);
        assert_eq!(records[0].links.len(), 1);

        rebuild_links(&mut records, &["no links anymore".to_string()]);
        assert!(records[0].links.is_empty());
    }
}
