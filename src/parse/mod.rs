pub mod node;
pub mod normalize;
pub mod position;
pub mod reader;

pub use node::{Attribute, Content, ElementNode, Namespace, NodeId, QName, XmlDocument};
pub use normalize::{NormalizeParams, Normalizer, XmlNormalizer};
pub use position::TreePosition;
pub use reader::{parse_document, XmlReader};
