//! Per-element field extraction
//!
//! A document is walked once; for every element the pipeline's extractors
//! fill a `FieldRecord` cloned from the document base record.

pub mod ancestors;
pub mod context;
pub mod identity;
pub mod pipeline;
pub mod record;
pub mod text;

pub use context::{path_id_prefix, DocumentContext, DocumentInfo};
pub use identity::ElementIdentity;
pub use pipeline::{ElementExtractor, Pipeline, PipelineOutput};
pub use record::FieldRecord;
