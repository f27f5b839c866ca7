//! Size-bounded batching in front of an index backend
//!
//! Records collect in one open batch. When it crosses the byte or record
//! limit it is swapped for an empty one and flushed before `add` returns, so
//! a slow index slows the producer down instead of growing memory.

use crate::core::config::IndexConfig;
use crate::core::error::Result;
use crate::extract::{path_id_prefix, FieldRecord};
use crate::index::backend::{DeleteFilter, IndexBackend};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub batches_flushed: usize,
    pub records_written: usize,
    pub deletes: usize,
}

pub struct BatchWriter<B: IndexBackend> {
    backend: B,
    batch: Vec<FieldRecord>,
    batch_bytes: usize,
    max_bytes: usize,
    max_records: usize,
    stats: BatchStats,
    uncommitted: bool,
}

impl<B: IndexBackend> BatchWriter<B> {
    pub fn new(backend: B, config: &IndexConfig) -> Self {
        Self {
            backend,
            batch: Vec::new(),
            batch_bytes: 0,
            max_bytes: config.batch_max_bytes,
            max_records: config.batch_max_records.max(1),
            stats: BatchStats::default(),
            uncommitted: false,
        }
    }

    pub fn add(&mut self, record: FieldRecord) -> Result<()> {
        self.batch_bytes += record.estimated_size();
        self.batch.push(record);

        if self.batch_bytes >= self.max_bytes || self.batch.len() >= self.max_records {
            self.flush()?;
        }
        Ok(())
    }

    /// Remove every revision of a path, pending records included
    pub fn delete_path(&mut self, repo: &str, path: &str) -> Result<()> {
        let prefix = path_id_prefix(repo, path);
        let dropped = self.drop_pending(&prefix);
        debug!(prefix = %prefix, dropped, "Deleting path");
        self.backend.delete(&DeleteFilter::prefix("id", prefix))?;
        self.stats.deletes += 1;
        self.uncommitted = true;
        Ok(())
    }

    /// Drop every trace of a path that failed half-way
    pub fn abort_path(&mut self, repo: &str, path: &str) -> Result<()> {
        warn!(repo = %repo, path = %path, "Aborting partially indexed path");
        self.delete_path(repo, path)
    }

    /// Flush and commit so readers of the backend see everything written so far
    pub fn sync(&mut self) -> Result<()> {
        if !self.batch.is_empty() {
            self.flush()?;
        }
        if self.uncommitted {
            self.commit()?;
        }
        Ok(())
    }

    /// Records waiting for the next flush
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Flush what is left and commit
    pub fn end(&mut self) -> Result<BatchStats> {
        if self.batch.is_empty() {
            warn!("Batch session ended without pending records");
        } else {
            self.flush()?;
        }
        self.commit()?;
        info!(
            batches = self.stats.batches_flushed,
            records = self.stats.records_written,
            "Index session committed"
        );
        Ok(self.stats)
    }

    fn commit(&mut self) -> Result<()> {
        self.backend.commit()?;
        self.uncommitted = false;
        Ok(())
    }

    /// Discard pending records whose id starts with `prefix`
    fn drop_pending(&mut self, prefix: &str) -> usize {
        let before = self.batch.len();
        self.batch
            .retain(|r| !r.first("id").is_some_and(|id| id.starts_with(prefix)));
        if self.batch.len() != before {
            self.batch_bytes = self.batch.iter().map(FieldRecord::estimated_size).sum();
        }
        before - self.batch.len()
    }

    fn flush(&mut self) -> Result<()> {
        let batch = std::mem::take(&mut self.batch);
        let bytes = std::mem::take(&mut self.batch_bytes);
        let count = batch.len();

        self.backend.add(batch)?;

        self.stats.batches_flushed += 1;
        self.stats.records_written += count;
        self.uncommitted = true;
        debug!(records = count, bytes, "Batch flushed");
        Ok(())
    }
}
