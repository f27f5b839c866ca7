use crate::extract::FieldRecord;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Add,
    Modify,
    Delete,
}

/// One path touched by a revision
#[derive(Debug, Clone)]
pub struct PathChange {
    pub action: ChangeAction,
    /// Base record: repo, path, rev and the path's properties
    pub base: FieldRecord,
    /// Raw document bytes, absent for deletes
    pub content: Option<Vec<u8>>,
}

impl PathChange {
    pub fn add(base: FieldRecord, content: impl Into<Vec<u8>>) -> Self {
        Self {
            action: ChangeAction::Add,
            base,
            content: Some(content.into()),
        }
    }

    pub fn modify(base: FieldRecord, content: impl Into<Vec<u8>>) -> Self {
        Self {
            action: ChangeAction::Modify,
            base,
            content: Some(content.into()),
        }
    }

    pub fn delete(base: FieldRecord) -> Self {
        Self {
            action: ChangeAction::Delete,
            base,
            content: None,
        }
    }

    pub fn path(&self) -> &str {
        self.base.first("path").unwrap_or_default()
    }
}

/// Outcome of indexing one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Element records written, not counting the summary
    Indexed { elements: usize },
    /// Not well-formed; only a flagged summary was written
    Malformed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathFailure {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    pub indexed: usize,
    pub deleted: usize,
    pub malformed: Vec<String>,
    pub failed: Vec<PathFailure>,
    pub elements: usize,
}

impl ChangeReport {
    pub fn is_clean(&self) -> bool {
        self.malformed.is_empty() && self.failed.is_empty()
    }
}
