pub mod backend;
pub mod batch;
pub mod memory;
pub mod schema;
pub mod tantivy_index;
pub mod writer;

pub use backend::{DeleteFilter, IndexBackend};
pub use batch::{BatchStats, BatchWriter};
pub use memory::MemoryIndex;
pub use schema::IndexSchema;
pub use tantivy_index::TantivyIndex;
pub use writer::TantivyBackend;
