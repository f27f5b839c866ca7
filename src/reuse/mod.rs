//! Content reuse and translation-memory qualification
//!
//! Every element gets a reuse value (eligible or a reason it is not), a
//! checksum of its reuse-relevant rendering and, inside a Translation, the
//! checksum of the Release element sharing its RID.

pub mod checksum;
pub mod render;
pub mod source;
pub mod state;
pub mod value;

pub use checksum::reuse_checksum;
pub use render::{render_reuse, RenderRules};
pub use source::{CachedReleaseLookup, ReleaseLookup};
pub use state::ReuseState;
pub use value::ReuseValue;
