use std::collections::HashMap;

/// Flags of one open element while its subtree is being walked
#[derive(Debug, Clone, Copy, Default)]
pub struct ReuseFrame {
    /// Marked suppressed itself or below a suppressed ancestor
    pub suppressed: bool,
    /// Marked skip-validation itself
    pub skip_validation: bool,
    /// Below an element marked skip-validation
    pub below_skip_validation: bool,
    /// Some descendant is suppressed
    pub contains_suppressed: bool,
    /// Some direct child is missing its RID
    pub child_missing_rid: bool,
}

/// Reuse bookkeeping for one document, reset at every document start
#[derive(Debug, Default)]
pub struct ReuseState {
    /// RID -> reuse checksum of the Release a Translation points at
    pub release_checksums: Option<HashMap<String, String>>,
    /// RIDs used by more than one element, in first-seen order
    pub duplicate_rids: Vec<String>,
    /// Translation elements whose RID the Release lacks
    pub source_missing: u32,
    /// Whether the document status allows reuse
    pub ready: bool,
    pub frames: Vec<ReuseFrame>,
}

impl ReuseState {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicate_rids.is_empty()
    }
}
