use pkm_core::DocId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Id,
    Slug,
    Alias,
    Title,
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub doc_id: Option<DocId>,
    pub resolution: Resolution,
}
