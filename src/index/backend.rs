//! The three operations the indexer needs from a search index

use crate::core::error::Result;
use crate::extract::FieldRecord;

/// Selects records to delete by one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteFilter {
    Equals { field: String, value: String },
    Prefix { field: String, prefix: String },
}

impl DeleteFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    pub fn matches(&self, record: &FieldRecord) -> bool {
        match self {
            Self::Equals { field, value } => record.get(field).iter().any(|v| v == value),
            Self::Prefix { field, prefix } => {
                record.get(field).iter().any(|v| v.starts_with(prefix.as_str()))
            }
        }
    }
}

pub trait IndexBackend {
    /// Add a batch of finished records
    fn add(&mut self, records: Vec<FieldRecord>) -> Result<()>;

    fn delete(&mut self, filter: &DeleteFilter) -> Result<()>;

    /// Make everything added or deleted so far durable and visible
    fn commit(&mut self) -> Result<()>;
}
