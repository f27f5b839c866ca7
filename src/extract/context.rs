//! Per-document state shared by the extractors of one indexing pass

use crate::core::config::ReuseConfig;
use crate::core::error::{Error, Result};
use crate::extract::identity::ElementIdentity;
use crate::extract::record::FieldRecord;
use crate::parse::{NodeId, XmlDocument};
use crate::reuse::state::ReuseState;
use tracing::warn;

pub const FIELD_REPO: &str = "repo";
pub const FIELD_PATH: &str = "path";
pub const FIELD_REV: &str = "rev";

/// Document identity and classification read from the base record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub repo: String,
    pub path: String,
    pub rev: u64,
    pub status: Option<String>,
    /// Logical id of the Release this document translates
    pub translation_source: Option<String>,
}

impl DocumentInfo {
    pub fn from_base(base: &FieldRecord, config: &ReuseConfig) -> Result<Self> {
        let repo = required(base, FIELD_REPO)?;
        let path = required(base, FIELD_PATH)?;
        let rev = required(base, FIELD_REV)?
            .parse()
            .map_err(|_| Error::MissingField {
                field: format!("{} (not a revision number)", FIELD_REV),
            })?;

        Ok(Self {
            status: optional(base, &config.status_field, &path),
            translation_source: optional(base, &config.translation_source_field, &path),
            repo,
            path,
            rev,
        })
    }

    /// `{repo}^{path}?p={rev}`, also the id of the summary record
    pub fn logical_id(&self) -> String {
        format!("{}{}", path_id_prefix(&self.repo, &self.path), self.rev)
    }

    /// First path segment, e.g. `release` for `/release/a.xml`
    pub fn path_area(&self) -> Option<String> {
        self.path
            .split('/')
            .find(|segment| !segment.is_empty())
            .filter(|_| self.path.trim_start_matches('/').contains('/'))
            .map(str::to_string)
    }

    pub fn is_translation(&self) -> bool {
        self.translation_source.is_some()
    }
}

/// Prefix shared by the ids of every record ever indexed for a path
pub fn path_id_prefix(repo: &str, path: &str) -> String {
    format!("{}^{}?p=", repo, path)
}

fn required(base: &FieldRecord, field: &str) -> Result<String> {
    base.first(field)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::MissingField {
            field: field.to_string(),
        })
}

fn optional(base: &FieldRecord, field: &str, path: &str) -> Option<String> {
    match base.first(field) {
        Some("") => {
            warn!(path, field, "Property present but empty");
            None
        }
        other => other.map(str::to_string),
    }
}

/// Mutable state of one document pass, passed by reference through every hook
pub struct DocumentContext<'a> {
    pub document: &'a XmlDocument,
    pub base: &'a FieldRecord,
    pub info: DocumentInfo,
    pub identity: ElementIdentity,
    /// Assigned ids by node, filled in pre-order
    pub element_ids: Vec<Option<String>>,
    pub reuse: ReuseState,
}

impl<'a> DocumentContext<'a> {
    pub fn new(document: &'a XmlDocument, base: &'a FieldRecord, info: DocumentInfo) -> Self {
        Self {
            document,
            base,
            info,
            identity: ElementIdentity::default(),
            element_ids: vec![None; document.len()],
            reuse: ReuseState::default(),
        }
    }

    pub fn element_id(&self, node: NodeId) -> Option<&str> {
        self.element_ids.get(node).and_then(|id| id.as_deref())
    }
}
