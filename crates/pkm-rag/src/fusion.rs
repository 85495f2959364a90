use std::collections::HashMap;

use pkm_core::{ChunkId, DocId};

/// Weighted Reciprocal Rank Fusion over two already-ranked id lists. Each
/// item at 1-based rank `r` in a list contributes `1 / (rrf_k + r)`;
/// contributions from both lists are summed per `chunk_id`. Ties in the
/// fused score break by `chunk_id` ascending, which is `(doc_id, chunk_hash)`
/// byte order via `ChunkId`'s derived `Ord`.
///
/// Chunks absent from a list simply don't contribute from it — there is no
/// penalty term, matching the donor's `rrf_fuse`.
pub fn rrf_fuse(lexical: &[ChunkId], semantic: &[ChunkId], rrf_k: f64) -> Vec<(ChunkId, f64)> {
    let mut scores: HashMap<ChunkId, f64> = HashMap::new();

    for (i, id) in lexical.iter().enumerate() {
        let rank = (i + 1) as f64;
        *scores.entry(*id).or_insert(0.0) += 1.0 / (rrf_k + rank);
    }
    for (i, id) in semantic.iter().enumerate() {
        let rank = (i + 1) as f64;
        *scores.entry(*id).or_insert(0.0) += 1.0 / (rrf_k + rank);
    }

    let mut out: Vec<(ChunkId, f64)> = scores.into_iter().collect();
    out.sort_by(|(ida, sa), (idb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| ida.cmp(idb))
    });
    out
}

/// Walks a ranked list, keeping at most `group_limit` entries per `doc_id`
/// and stopping once `limit` surviving entries have been kept. Input order
/// is preserved among survivors — this never re-sorts, only filters.
pub fn group_by_document<T>(
    ranked: Vec<T>,
    doc_id_of: impl Fn(&T) -> DocId,
    group_limit: usize,
    limit: usize,
) -> Vec<T> {
    let mut counts: HashMap<DocId, usize> = HashMap::new();
    let mut out = Vec::with_capacity(limit.min(ranked.len()));

    for item in ranked {
        if out.len() >= limit {
            break;
        }
        let doc_id = doc_id_of(&item);
        let count = counts.entry(doc_id).or_insert(0);
        if *count >= group_limit {
            continue;
        }
        *count += 1;
        out.push(item);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkm_core::ChunkHash;

    fn cid(doc: DocId, seed: u8) -> ChunkId {
        ChunkId::new(doc, ChunkHash::from_bytes([seed; 6]))
    }

    #[test]
    fn chunk_present_in_both_lists_outranks_single_list_hits() {
        let doc = DocId::generate();
        let x = cid(doc, 1);
        let y = cid(doc, 2);
        let z = cid(doc, 3);

        // x: rank 1 in both lists. y: rank 2 lexical only. z: rank 1 semantic only.
        let lexical = vec![x, y];
        let semantic = vec![x, z];

        let fused = rrf_fuse(&lexical, &semantic, 60.0);
        assert_eq!(fused[0].0, x, "chunk present in both lists should rank first");
    }

    #[test]
    fn property_p5_rrf_monotonicity() {
        let doc = DocId::generate();
        let x = cid(doc, 10);
        let y = cid(doc, 20);

        // x outranks y in both lists (lower rank number = better).
        let lexical = vec![x, y];
        let semantic = vec![x, y];

        let fused = rrf_fuse(&lexical, &semantic, 60.0);
        let rank_x = fused.iter().position(|(id, _)| *id == x).unwrap();
        let rank_y = fused.iter().position(|(id, _)| *id == y).unwrap();
        assert!(rank_x < rank_y);
    }

    #[test]
    fn tie_breaks_by_chunk_id_ascending() {
        let doc = DocId::generate();
        let a = cid(doc, 1);
        let b = cid(doc, 2);
        // Disjoint single-list appearances at the same rank produce equal scores.
        let fused = rrf_fuse(&[b], &[a], 60.0);
        let expected_order = if a < b { (a, b) } else { (b, a) };
        assert_eq!((fused[0].0, fused[1].0), expected_order);
    }

    #[test]
    fn empty_lists_fuse_to_empty() {
        assert!(rrf_fuse(&[], &[], 60.0).is_empty());
    }

    #[test]
    fn property_p6_grouping_bound() {
        let doc_a = DocId::generate();
        let doc_b = DocId::generate();
        let ranked: Vec<(ChunkId, DocId)> = (0..10)
            .map(|i| (cid(doc_a, i), doc_a))
            .chain((0..2).map(|i| (cid(doc_b, i + 100), doc_b)))
            .collect();

        let grouped = group_by_document(ranked, |(_, doc)| *doc, 3, 10);
        let from_a = grouped.iter().filter(|(_, doc)| *doc == doc_a).count();
        assert!(from_a <= 3);
        let from_b = grouped.iter().filter(|(_, doc)| *doc == doc_b).count();
        assert_eq!(from_b, 2);
    }

    #[test]
    fn grouping_stops_once_limit_items_collected() {
        let doc = DocId::generate();
        let ranked: Vec<(ChunkId, DocId)> = (0..20).map(|i| (cid(doc, i), doc)).collect();
        let grouped = group_by_document(ranked, |(_, doc)| *doc, 100, 5);
        assert_eq!(grouped.len(), 5);
    }
}
