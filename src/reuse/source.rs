//! Translation-vs-Release checksum matching
//!
//! A Translation's Release is resolved once per document into a RID ->
//! checksum map. Each Translation element then looks up its own RID to get
//! the checksum of the Release content it was translated from.

use crate::core::config::ReuseConfig;
use crate::core::error::{Error, Result};
use crate::extract::context::DocumentContext;
use crate::extract::pipeline::ElementExtractor;
use crate::extract::record::FieldRecord;
use crate::parse::ElementNode;
use crate::reuse::value::RID_ATTRIBUTE;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves the element checksums of an indexed Release document
pub trait ReleaseLookup: Send + Sync {
    /// RID -> reuse checksum for every element of the Release with this logical id
    fn release_checksums(&self, logical_id: &str) -> Result<HashMap<String, String>>;
}

impl<T: ReleaseLookup + ?Sized> ReleaseLookup for Arc<T> {
    fn release_checksums(&self, logical_id: &str) -> Result<HashMap<String, String>> {
        (**self).release_checksums(logical_id)
    }
}

/// Keeps recently resolved Releases in memory
pub struct CachedReleaseLookup<L> {
    inner: L,
    cache: Mutex<LruCache<String, Arc<HashMap<String, String>>>>,
}

impl<L: ReleaseLookup> CachedReleaseLookup<L> {
    pub fn new(inner: L, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Forget a Release, e.g. after it was reindexed
    pub fn invalidate(&self, logical_id: &str) {
        self.cache.lock().pop(logical_id);
    }

    /// Forget every cached Release whose logical id starts with `prefix`
    pub fn invalidate_prefix(&self, prefix: &str) {
        let mut cache = self.cache.lock();
        let stale: Vec<String> = cache
            .iter()
            .filter(|(id, _)| id.starts_with(prefix))
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            cache.pop(&id);
        }
    }
}

impl<L: ReleaseLookup> ReleaseLookup for CachedReleaseLookup<L> {
    fn release_checksums(&self, logical_id: &str) -> Result<HashMap<String, String>> {
        if let Some(hit) = self.cache.lock().get(logical_id) {
            return Ok(hit.as_ref().clone());
        }
        let resolved = self.inner.release_checksums(logical_id)?;
        // An empty answer may only mean the Release is not written yet
        if !resolved.is_empty() {
            self.cache
                .lock()
                .put(logical_id.to_string(), Arc::new(resolved.clone()));
        }
        Ok(resolved)
    }
}

pub struct ReuseSourceExtractor {
    namespace: String,
    lookup: Arc<dyn ReleaseLookup>,
}

impl ReuseSourceExtractor {
    pub fn new(config: &ReuseConfig, lookup: Arc<dyn ReleaseLookup>) -> Self {
        Self {
            namespace: config.cms_namespace.clone(),
            lookup,
        }
    }
}

impl ElementExtractor for ReuseSourceExtractor {
    fn name(&self) -> &'static str {
        "reuse_source"
    }

    fn provides(&self) -> &'static [&'static str] {
        &["reuse_source_checksum"]
    }

    fn start_document(&self, ctx: &mut DocumentContext<'_>) -> Result<()> {
        ctx.reuse.release_checksums = None;
        ctx.reuse.source_missing = 0;

        let Some(source) = ctx.info.translation_source.as_deref() else {
            return Ok(());
        };

        let checksums = self
            .lookup
            .release_checksums(source)
            .map_err(|e| Error::extractor(self.name(), format!("Release {}: {}", source, e)))?;
        if checksums.is_empty() {
            warn!(path = %ctx.info.path, release = source, "Release has no indexed elements");
        } else {
            info!(
                path = %ctx.info.path,
                release = source,
                elements = checksums.len(),
                "Resolved Release checksums"
            );
        }
        ctx.reuse.release_checksums = Some(checksums);
        Ok(())
    }

    fn end(
        &self,
        node: &ElementNode,
        ctx: &mut DocumentContext<'_>,
        record: &mut FieldRecord,
    ) -> Result<()> {
        let Some(checksums) = ctx.reuse.release_checksums.as_ref() else {
            return Ok(());
        };
        let Some(rid) = node.attribute_ns(&self.namespace, RID_ATTRIBUTE) else {
            return Ok(());
        };

        match checksums.get(rid) {
            Some(checksum) => {
                debug!(rid, "Matched Release element");
                record.set("reuse_source_checksum", checksum.as_str());
            }
            None => {
                warn!(path = %ctx.info.path, rid, "RID not found in Release");
                ctx.reuse.source_missing += 1;
            }
        }
        Ok(())
    }

    fn end_document(&self, ctx: &mut DocumentContext<'_>, summary: &mut FieldRecord) -> Result<()> {
        if let Some(source) = ctx.info.translation_source.as_deref() {
            summary.set("reuse_source", source);
            summary.set("reuse_source_missing", ctx.reuse.source_missing.to_string());
        }
        Ok(())
    }
}
