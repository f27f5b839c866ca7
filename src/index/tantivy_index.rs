//! Tantivy index wrapper

use crate::core::error::{Error, Result};
use crate::index::schema::IndexSchema;
use crate::reuse::source::ReleaseLookup;
use std::collections::HashMap;
use std::path::Path;
use tantivy::collector::DocSetCollector;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{Index, IndexReader, ReloadPolicy, TantivyDocument, Term};

/// Wrapper around Tantivy index
pub struct TantivyIndex {
    pub index: Index,
    pub schema: IndexSchema,
    pub reader: IndexReader,
}

impl TantivyIndex {
    /// Open or create an index in `index_dir`
    pub fn open_or_create(index_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;

        let schema = IndexSchema::new();

        let index = if index_dir.join("meta.json").exists() {
            Index::open_in_dir(index_dir).map_err(|e| Error::IndexError {
                message: format!("Failed to open index: {}", e),
            })?
        } else {
            Index::create_in_dir(index_dir, schema.schema.clone()).map_err(|e| {
                Error::IndexError {
                    message: format!("Failed to create index: {}", e),
                }
            })?
        };

        Self::with_index(index, schema)
    }

    /// Open an existing index (fails if not found)
    pub fn open(index_dir: &Path) -> Result<Self> {
        if !index_dir.join("meta.json").exists() {
            return Err(Error::IndexError {
                message: format!("No index found at {}", index_dir.display()),
            });
        }

        let schema = IndexSchema::new();
        let index = Index::open_in_dir(index_dir)?;
        Self::with_index(index, schema)
    }

    pub fn create_in_ram() -> Result<Self> {
        let schema = IndexSchema::new();
        let index = Index::create_in_ram(schema.schema.clone());
        Self::with_index(index, schema)
    }

    fn with_index(index: Index, schema: IndexSchema) -> Result<Self> {
        // Manual reload: lookups must see a commit as soon as it returns
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| Error::IndexError {
                message: format!("Failed to create reader: {}", e),
            })?;

        Ok(Self {
            index,
            schema,
            reader,
        })
    }

    /// Pick up the latest commit
    pub fn reload(&self) -> Result<()> {
        self.reader.reload()?;
        Ok(())
    }

    fn term_query(&self, field: tantivy::schema::Field, value: &str) -> Box<dyn Query> {
        Box::new(TermQuery::new(
            Term::from_field_text(field, value),
            IndexRecordOption::Basic,
        ))
    }
}

impl ReleaseLookup for TantivyIndex {
    fn release_checksums(&self, logical_id: &str) -> Result<HashMap<String, String>> {
        let query = BooleanQuery::new(vec![
            (Occur::Must, self.term_query(self.schema.kind, "xml")),
            (Occur::Must, self.term_query(self.schema.logicalid, logical_id)),
        ]);

        let searcher = self.reader.searcher();
        let addresses = searcher.search(&query, &DocSetCollector)?;

        let mut checksums = HashMap::with_capacity(addresses.len());
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            let rid = doc.get_first(self.schema.reuse_rid).and_then(|v| v.as_str());
            let checksum = doc
                .get_first(self.schema.reuse_checksum)
                .and_then(|v| v.as_str());
            if let (Some(rid), Some(checksum)) = (rid, checksum) {
                checksums.insert(rid.to_string(), checksum.to_string());
            }
        }

        Ok(checksums)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_index_fails() {
        let dir = TempDir::new().unwrap();
        assert!(TantivyIndex::open(dir.path()).is_err());
    }

    #[test]
    fn test_open_or_create_then_open() {
        let dir = TempDir::new().unwrap();
        TantivyIndex::open_or_create(dir.path()).unwrap();
        assert!(dir.path().join("meta.json").exists());
        TantivyIndex::open(dir.path()).unwrap();
    }

    #[test]
    fn test_empty_index_has_no_release() {
        let index = TantivyIndex::create_in_ram().unwrap();
        assert!(index.release_checksums("demo^/a.xml?p=1").unwrap().is_empty());
    }
}
