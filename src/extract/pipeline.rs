//! Ordered extractor pipeline
//!
//! Every element passes through the extractors in a fixed order: `begin` in
//! pre-order, `end` in post-order once the whole subtree has been visited.
//! Extractors declare the fields they need and produce, and the order is
//! checked once when the pipeline is built.

use crate::core::config::ReuseConfig;
use crate::core::error::{Error, Result};
use crate::extract::ancestors::AncestorExtractor;
use crate::extract::context::{DocumentContext, FIELD_PATH, FIELD_REPO, FIELD_REV};
use crate::extract::identity::IdentityExtractor;
use crate::extract::record::FieldRecord;
use crate::extract::text::TextExtractor;
use crate::parse::{ElementNode, NodeId};
use crate::reuse::checksum::ReuseChecksumExtractor;
use crate::reuse::render::ReuseContentExtractor;
use crate::reuse::source::{ReleaseLookup, ReuseSourceExtractor};
use crate::reuse::value::ReuseValueExtractor;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// One stage of per-element field extraction
pub trait ElementExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fields that must already be on the record when `end` runs
    fn requires(&self) -> &'static [&'static str] {
        &[]
    }

    /// Fields this extractor may set
    fn provides(&self) -> &'static [&'static str] {
        &[]
    }

    fn start_document(&self, _ctx: &mut DocumentContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Pre-order hook
    fn begin(&self, _node: &ElementNode, _ctx: &mut DocumentContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Post-order hook; the whole subtree of `node` has been visited
    fn end(
        &self,
        node: &ElementNode,
        ctx: &mut DocumentContext<'_>,
        record: &mut FieldRecord,
    ) -> Result<()>;

    /// Called once after the root element ended, with the document summary
    fn end_document(
        &self,
        _ctx: &mut DocumentContext<'_>,
        _summary: &mut FieldRecord,
    ) -> Result<()> {
        Ok(())
    }
}

/// Output of one document pass
pub struct PipelineOutput {
    /// Element records in post-order
    pub records: Vec<FieldRecord>,
    /// Fields contributed to the summary record
    pub summary: FieldRecord,
}

pub struct Pipeline {
    extractors: Vec<Box<dyn ElementExtractor>>,
}

impl Pipeline {
    pub fn new(extractors: Vec<Box<dyn ElementExtractor>>) -> Result<Self> {
        let mut available: HashSet<&'static str> =
            [FIELD_REPO, FIELD_PATH, FIELD_REV].into_iter().collect();

        for extractor in &extractors {
            for field in extractor.requires() {
                if !available.contains(field) {
                    return Err(Error::PipelineOrder {
                        extractor: extractor.name(),
                        field,
                    });
                }
            }
            available.extend(extractor.provides().iter().copied());
        }

        Ok(Self { extractors })
    }

    /// The production order used by the indexer
    pub fn standard(config: &ReuseConfig, lookup: Arc<dyn ReleaseLookup>) -> Result<Self> {
        Self::new(vec![
            Box::new(IdentityExtractor),
            Box::new(AncestorExtractor),
            Box::new(TextExtractor),
            Box::new(ReuseContentExtractor::new(config)),
            Box::new(ReuseChecksumExtractor),
            Box::new(ReuseSourceExtractor::new(config, lookup)),
            Box::new(ReuseValueExtractor::new(config)),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// Walk the document once, depth-first
    pub fn run(&self, ctx: &mut DocumentContext<'_>) -> Result<PipelineOutput> {
        let document = ctx.document;
        for extractor in &self.extractors {
            extractor.start_document(ctx)?;
        }

        let mut records = Vec::with_capacity(document.len());
        // (node, children already entered)
        let mut stack: Vec<(NodeId, usize)> = Vec::with_capacity(16);

        if !document.is_empty() {
            self.begin(document.root(), ctx)?;
            stack.push((0, 0));
        }

        while let Some((id, next_child)) = stack.last_mut() {
            let node = document.node(*id);
            if let Some(&child) = node.children.get(*next_child) {
                *next_child += 1;
                self.begin(document.node(child), ctx)?;
                stack.push((child, 0));
                continue;
            }

            stack.pop();
            let mut record = ctx.base.clone();
            for extractor in &self.extractors {
                extractor.end(node, ctx, &mut record)?;
            }
            debug!(
                pos = %node.position,
                name = %node.name.qualified(),
                fields = record.len(),
                "Element extracted"
            );
            records.push(record);
        }

        let mut summary = FieldRecord::new();
        for extractor in &self.extractors {
            extractor.end_document(ctx, &mut summary)?;
        }

        Ok(PipelineOutput { records, summary })
    }

    fn begin(&self, node: &ElementNode, ctx: &mut DocumentContext<'_>) -> Result<()> {
        for extractor in &self.extractors {
            extractor.begin(node, ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::context::DocumentInfo;
    use crate::parse::parse_document;

    struct Needs;
    impl ElementExtractor for Needs {
        fn name(&self) -> &'static str {
            "needs"
        }
        fn requires(&self) -> &'static [&'static str] {
            &["reuse_text"]
        }
        fn end(
            &self,
            _: &ElementNode,
            _: &mut DocumentContext<'_>,
            _: &mut FieldRecord,
        ) -> Result<()> {
            Ok(())
        }
    }

    /// Records hook order as `+name` / `-name`
    struct Trace(parking_lot::Mutex<Vec<String>>);
    impl ElementExtractor for Trace {
        fn name(&self) -> &'static str {
            "trace"
        }
        fn begin(&self, node: &ElementNode, _: &mut DocumentContext<'_>) -> Result<()> {
            self.0.lock().push(format!("+{}", node.name.local));
            Ok(())
        }
        fn end(
            &self,
            node: &ElementNode,
            _: &mut DocumentContext<'_>,
            _: &mut FieldRecord,
        ) -> Result<()> {
            self.0.lock().push(format!("-{}", node.name.local));
            Ok(())
        }
    }

    #[test]
    fn test_order_is_validated() {
        let err = Pipeline::new(vec![Box::new(Needs)]).err().unwrap();
        assert!(matches!(
            err,
            Error::PipelineOrder { extractor: "needs", field: "reuse_text" }
        ));
    }

    #[test]
    fn test_standard_order_is_valid() {
        let pipeline = Pipeline::standard(
            &ReuseConfig::default(),
            Arc::new(crate::index::MemoryIndex::new()),
        )
        .unwrap();
        assert_eq!(pipeline.names()[0], "identity");
        assert_eq!(pipeline.names().last(), Some(&"reuse_value"));
    }

    #[test]
    fn test_pre_and_post_order() {
        let doc = parse_document("t.xml", "<a><b><c/></b><d/></a>").unwrap();
        let base: FieldRecord = [("repo", "r"), ("path", "/t.xml"), ("rev", "1")]
            .into_iter()
            .collect();
        let info = DocumentInfo::from_base(&base, &ReuseConfig::default()).unwrap();
        let mut ctx = DocumentContext::new(&doc, &base, info);

        let trace = Arc::new(Trace(parking_lot::Mutex::new(Vec::new())));
        struct Shared(Arc<Trace>);
        impl ElementExtractor for Shared {
            fn name(&self) -> &'static str {
                "shared"
            }
            fn begin(&self, node: &ElementNode, ctx: &mut DocumentContext<'_>) -> Result<()> {
                self.0.begin(node, ctx)
            }
            fn end(
                &self,
                node: &ElementNode,
                ctx: &mut DocumentContext<'_>,
                r: &mut FieldRecord,
            ) -> Result<()> {
                self.0.end(node, ctx, r)
            }
        }

        let pipeline = Pipeline::new(vec![Box::new(Shared(Arc::clone(&trace)))]).unwrap();
        let output = pipeline.run(&mut ctx).unwrap();

        assert_eq!(output.records.len(), 4);
        assert_eq!(
            *trace.0.lock(),
            ["+a", "+b", "+c", "-c", "-b", "+d", "-d", "-a"]
        );
    }
}
