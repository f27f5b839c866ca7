//! Reuse eligibility per element
//!
//! Disqualification travels in three directions: a suppressed element takes
//! its whole subtree and all its ancestors with it, skip-validation only its
//! descendants, and a missing RID its parent. Ancestors are decided in
//! post-order, so whatever their subtree contributed is known by then.

use crate::core::config::ReuseConfig;
use crate::core::error::{Error, Result};
use crate::extract::context::DocumentContext;
use crate::extract::pipeline::ElementExtractor;
use crate::extract::record::FieldRecord;
use crate::parse::ElementNode;
use crate::reuse::state::ReuseFrame;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const RID_ATTRIBUTE: &str = "rid";
pub const RLOGICALID_ATTRIBUTE: &str = "rlogicalid";
pub const SUPPRESS_ATTRIBUTE: &str = "tsuppress";
pub const VALIDATE_ATTRIBUTE: &str = "tvalidate";
pub const STATUS_ATTRIBUTE: &str = "status";

/// Reuse eligibility; the numeric code is what the index stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReuseValue {
    Eligible,
    /// Marked suppressed, or below a suppressed element
    Suppressed,
    /// Above a suppressed element
    ContainsSuppressed,
    /// Below an element marked skip-validation
    BelowSkipValidation,
    /// No RID although the document carries RIDs
    MissingRid,
    /// A direct child has no RID
    ChildMissingRid,
    /// The document uses some RID twice
    DuplicateRid,
}

impl ReuseValue {
    pub fn code(&self) -> i32 {
        match self {
            Self::Eligible => 1,
            Self::Suppressed => -1,
            Self::ContainsSuppressed => -2,
            Self::BelowSkipValidation => -3,
            Self::MissingRid => -4,
            Self::ChildMissingRid => -5,
            Self::DuplicateRid => -6,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Eligible),
            -1 => Some(Self::Suppressed),
            -2 => Some(Self::ContainsSuppressed),
            -3 => Some(Self::BelowSkipValidation),
            -4 => Some(Self::MissingRid),
            -5 => Some(Self::ChildMissingRid),
            -6 => Some(Self::DuplicateRid),
            _ => None,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.code() > 0
    }
}

pub struct ReuseValueExtractor {
    namespace: String,
    released_statuses: Vec<String>,
}

impl ReuseValueExtractor {
    pub fn new(config: &ReuseConfig) -> Self {
        Self {
            namespace: config.cms_namespace.clone(),
            released_statuses: config.released_statuses.clone(),
        }
    }

    fn decide(frame: &ReuseFrame, duplicates: bool, missing_rid: bool) -> ReuseValue {
        if duplicates {
            ReuseValue::DuplicateRid
        } else if frame.suppressed {
            ReuseValue::Suppressed
        } else if frame.contains_suppressed {
            ReuseValue::ContainsSuppressed
        } else if frame.below_skip_validation {
            ReuseValue::BelowSkipValidation
        } else if missing_rid {
            ReuseValue::MissingRid
        } else if frame.child_missing_rid {
            ReuseValue::ChildMissingRid
        } else {
            ReuseValue::Eligible
        }
    }
}

impl ElementExtractor for ReuseValueExtractor {
    fn name(&self) -> &'static str {
        "reuse_value"
    }

    fn provides(&self) -> &'static [&'static str] {
        &["reusevalue", "reuseready", "reuse_rid"]
    }

    fn start_document(&self, ctx: &mut DocumentContext<'_>) -> Result<()> {
        let document = ctx.document;
        let status = ctx.info.status.clone().or_else(|| {
            document
                .root()
                .attribute_ns(&self.namespace, STATUS_ATTRIBUTE)
                .map(str::to_string)
        });
        ctx.reuse.ready = status
            .as_deref()
            .is_some_and(|s| self.released_statuses.iter().any(|r| r == s));
        ctx.reuse.frames.clear();

        let mut seen: HashMap<&str, u32> = HashMap::new();
        for node in document.iter() {
            if let Some(rid) = node.attribute_ns(&self.namespace, RID_ATTRIBUTE) {
                let count = seen.entry(rid).or_insert(0);
                *count += 1;
                if *count == 2 {
                    ctx.reuse.duplicate_rids.push(rid.to_string());
                }
            }
        }

        if ctx.reuse.has_duplicates() {
            warn!(
                path = %ctx.info.path,
                rids = ?ctx.reuse.duplicate_rids,
                "Duplicate RIDs, no element is reusable"
            );
        }
        debug!(path = %ctx.info.path, ready = ctx.reuse.ready, status = ?status, "Reuse readiness");
        Ok(())
    }

    fn begin(&self, node: &ElementNode, ctx: &mut DocumentContext<'_>) -> Result<()> {
        let parent = ctx.reuse.frames.last().copied().unwrap_or_default();
        let suppressed_here = node
            .attribute_ns(&self.namespace, SUPPRESS_ATTRIBUTE)
            .is_some_and(|v| v != "no");
        let skip_here = node.attribute_ns(&self.namespace, VALIDATE_ATTRIBUTE) == Some("no");

        ctx.reuse.frames.push(ReuseFrame {
            suppressed: parent.suppressed || suppressed_here,
            skip_validation: skip_here,
            below_skip_validation: parent.below_skip_validation || parent.skip_validation,
            contains_suppressed: false,
            child_missing_rid: false,
        });
        Ok(())
    }

    fn end(
        &self,
        node: &ElementNode,
        ctx: &mut DocumentContext<'_>,
        record: &mut FieldRecord,
    ) -> Result<()> {
        let frame = ctx
            .reuse
            .frames
            .pop()
            .ok_or_else(|| Error::extractor(self.name(), "element ended before it began"))?;

        let rid = node.attribute_ns(&self.namespace, RID_ATTRIBUTE);
        let rids_in_use = ctx
            .document
            .inherited_attribute_ns(node, &self.namespace, RLOGICALID_ATTRIBUTE)
            .is_some();
        let missing_rid = rids_in_use && rid.is_none();

        let value = Self::decide(&frame, ctx.reuse.has_duplicates(), missing_rid);

        if let Some(parent) = ctx.reuse.frames.last_mut() {
            parent.contains_suppressed |= frame.suppressed || frame.contains_suppressed;
            parent.child_missing_rid |= missing_rid;
        }

        record.set("reusevalue", value.code().to_string());
        record.set("reuseready", if ctx.reuse.ready { "1" } else { "0" });
        if let Some(rid) = rid {
            record.set("reuse_rid", rid);
        }
        Ok(())
    }

    fn end_document(&self, ctx: &mut DocumentContext<'_>, summary: &mut FieldRecord) -> Result<()> {
        summary.set("reuseready", if ctx.reuse.ready { "1" } else { "0" });
        for rid in &ctx.reuse.duplicate_rids {
            summary.add("reuse_ridduplicate", rid.as_str());
        }
        Ok(())
    }
}
