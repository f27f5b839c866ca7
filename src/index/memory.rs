//! In-process index backend
//!
//! Clones share one store, so a writer and a Release lookup can work on the
//! same data.

use crate::core::error::Result;
use crate::extract::FieldRecord;
use crate::index::backend::{DeleteFilter, IndexBackend};
use crate::reuse::source::ReleaseLookup;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MemoryStore {
    records: Vec<FieldRecord>,
    batches: usize,
    commits: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<FieldRecord> {
        self.store.read().records.clone()
    }

    /// Records where `field` has `value`
    pub fn find(&self, field: &str, value: &str) -> Vec<FieldRecord> {
        let filter = DeleteFilter::equals(field, value);
        self.store
            .read()
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.store.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `add` calls received
    pub fn batches(&self) -> usize {
        self.store.read().batches
    }

    pub fn commits(&self) -> usize {
        self.store.read().commits
    }
}

impl IndexBackend for MemoryIndex {
    fn add(&mut self, records: Vec<FieldRecord>) -> Result<()> {
        let mut store = self.store.write();
        store.batches += 1;
        store.records.extend(records);
        Ok(())
    }

    fn delete(&mut self, filter: &DeleteFilter) -> Result<()> {
        self.store.write().records.retain(|r| !filter.matches(r));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.store.write().commits += 1;
        Ok(())
    }
}

impl ReleaseLookup for MemoryIndex {
    fn release_checksums(&self, logical_id: &str) -> Result<HashMap<String, String>> {
        let store = self.store.read();
        Ok(store
            .records
            .iter()
            .filter(|r| r.first("type") == Some("xml") && r.first("logicalid") == Some(logical_id))
            .filter_map(|r| {
                Some((
                    r.first("reuse_rid")?.to_string(),
                    r.first("reuse_checksum")?.to_string(),
                ))
            })
            .collect())
    }
}
