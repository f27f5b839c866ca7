//! Stable per-element identifiers
//!
//! Ids are `{logical_id}|{counter}` where the counter runs in document order
//! and restarts for every document. The logical id carries repository, path
//! and revision, so the same revision always yields the same ids and a new
//! revision yields new ones.

use crate::core::error::{Error, Result};
use crate::extract::context::{DocumentContext, DocumentInfo};
use crate::extract::pipeline::ElementExtractor;
use crate::extract::record::FieldRecord;
use crate::parse::ElementNode;

#[derive(Debug, Default)]
pub struct ElementIdentity {
    prefix: Option<String>,
    counter: u32,
}

impl ElementIdentity {
    pub fn start(&mut self, info: &DocumentInfo) {
        self.prefix = Some(info.logical_id());
        self.counter = 0;
    }

    pub fn next_id(&mut self) -> Result<String> {
        let prefix = self.prefix.as_ref().ok_or(Error::IdentityNotStarted)?;
        self.counter += 1;
        Ok(format!("{}|{:06}", prefix, self.counter))
    }

    /// Identifiers handed out so far in this document
    pub fn issued(&self) -> u32 {
        self.counter
    }
}

/// Assigns ids in pre-order and records id, parent, root and position fields
pub struct IdentityExtractor;

impl ElementExtractor for IdentityExtractor {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn provides(&self) -> &'static [&'static str] {
        &["id", "id_parent", "id_root", "pos", "type", "logicalid"]
    }

    fn start_document(&self, ctx: &mut DocumentContext<'_>) -> Result<()> {
        ctx.identity.start(&ctx.info);
        Ok(())
    }

    fn begin(&self, node: &ElementNode, ctx: &mut DocumentContext<'_>) -> Result<()> {
        let id = ctx.identity.next_id()?;
        ctx.element_ids[node.id] = Some(id);
        Ok(())
    }

    fn end(
        &self,
        node: &ElementNode,
        ctx: &mut DocumentContext<'_>,
        record: &mut FieldRecord,
    ) -> Result<()> {
        let id = ctx
            .element_id(node.id)
            .ok_or_else(|| Error::extractor(self.name(), "element ended before it began"))?;
        record.set("id", id);
        record.set("type", "xml");
        record.set("logicalid", ctx.info.logical_id());
        record.set("pos", node.position.as_str());
        if let Some(parent) = node.parent.and_then(|p| ctx.element_id(p)) {
            record.set("id_parent", parent);
        }
        if let Some(root) = ctx.element_id(0) {
            record.set("id_root", root);
        }
        Ok(())
    }
}
