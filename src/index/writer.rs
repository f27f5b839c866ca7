use crate::core::error::{Error, Result};
use crate::extract::FieldRecord;
use crate::index::backend::{DeleteFilter, IndexBackend};
use crate::index::schema::{IndexSchema, FIELD_FIELDS};
use crate::index::tantivy_index::TantivyIndex;
use serde_json::{Map, Value};
use std::sync::Arc;
use tantivy::query::RegexQuery;
use tantivy::schema::Field;
use tantivy::{IndexWriter, TantivyDocument, Term};
use tracing::debug;

/// Index backend writing to a tantivy index
pub struct TantivyBackend {
    index: Arc<TantivyIndex>,
    writer: IndexWriter,
    schema: IndexSchema,
}

impl TantivyBackend {
    /// `heap_bytes` bounds tantivy's internal buffers between commits
    pub fn new(index: Arc<TantivyIndex>, heap_bytes: usize) -> Result<Self> {
        let writer = index.index.writer(heap_bytes).map_err(|e| Error::IndexError {
            message: e.to_string(),
        })?;
        let schema = index.schema.clone();

        Ok(Self {
            index,
            writer,
            schema,
        })
    }

    pub fn index(&self) -> &Arc<TantivyIndex> {
        &self.index
    }

    fn field(&self, name: &str) -> Result<Field> {
        self.schema
            .schema
            .get_field(name)
            .map_err(|_| Error::IndexError {
                message: format!("Field {} is not part of the schema", name),
            })
    }

    /// Schema fields at top level, the whole record under `fields`
    fn to_document(&self, record: &FieldRecord) -> Result<TantivyDocument> {
        let mut object = Map::new();
        for name in IndexSchema::direct_fields() {
            let values = record.get(name);
            if !values.is_empty() {
                object.insert(
                    name.to_string(),
                    Value::Array(values.iter().cloned().map(Value::String).collect()),
                );
            }
        }
        object.insert(FIELD_FIELDS.to_string(), record.to_json());

        let json = serde_json::to_string(&Value::Object(object))?;
        TantivyDocument::parse_json(&self.schema.schema, &json).map_err(|e| Error::IndexError {
            message: format!("Failed to convert record: {}", e),
        })
    }
}

impl IndexBackend for TantivyBackend {
    fn add(&mut self, records: Vec<FieldRecord>) -> Result<()> {
        let count = records.len();
        for record in &records {
            let doc = self.to_document(record)?;
            self.writer.add_document(doc)?;
        }
        debug!(records = count, "Batch added");
        Ok(())
    }

    /// Deletes are O(1) in tantivy; documents are only marked
    fn delete(&mut self, filter: &DeleteFilter) -> Result<()> {
        match filter {
            DeleteFilter::Equals { field, value } => {
                let term = Term::from_field_text(self.field(field)?, value);
                self.writer.delete_term(term);
            }
            DeleteFilter::Prefix { field, prefix } => {
                let pattern = format!("{}.*", regex::escape(prefix));
                let query = RegexQuery::from_pattern(&pattern, self.field(field)?)?;
                self.writer.delete_query(Box::new(query))?;
            }
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.writer.commit().map_err(|e| Error::IndexError {
            message: e.to_string(),
        })?;
        self.index.reload()
    }
}
