//! xmldex - incremental element-level XML search indexing
//!
//! Each XML document becomes one record per element plus a summary record.
//! Element records carry a tree position, aggregated ancestor attributes,
//! plain text and a reuse qualification with checksums that let a
//! Translation's elements be matched against their Release.

pub mod cli;
pub mod core;
pub mod extract;
pub mod index;
pub mod indexer;
pub mod parse;
pub mod reuse;

pub use core::config::Config;
pub use core::error::{Error, Result};
pub use extract::{FieldRecord, Pipeline};
pub use index::{BatchWriter, IndexBackend, MemoryIndex, TantivyBackend, TantivyIndex};
pub use indexer::{ChangeAction, ChangeReport, PathChange, XmlIndexer};
pub use parse::TreePosition;
pub use reuse::ReuseValue;
