//! Read-only element tree
//!
//! The document owns every node in an arena; parent and sibling links are
//! plain indices into it.

use crate::parse::position::TreePosition;

/// Index of a node inside its `XmlDocument`
pub type NodeId = usize;

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace-qualified name as written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub namespace: Option<String>,
}

impl QName {
    /// Name as written, `prefix:local`
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }

    /// Qualified name usable inside a field name (`cms:rid` -> `cms.rid`)
    pub fn field_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}.{}", prefix, self.local),
            None => self.local.clone(),
        }
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == Some(namespace)
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// A namespace declared on an element; `prefix` is `None` for the default namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub prefix: Option<String>,
    pub uri: String,
}

#[derive(Debug, Clone)]
pub enum Content {
    Text(String),
    Element(NodeId),
    /// Processing instruction, target only
    Pi(String),
}

#[derive(Debug, Clone)]
pub struct ElementNode {
    pub id: NodeId,
    pub name: QName,
    /// Root is 1
    pub depth: u32,
    /// 1-based among sibling elements
    pub ordinal: u32,
    pub position: TreePosition,
    pub attributes: Vec<Attribute>,
    pub namespaces: Vec<Namespace>,
    pub parent: Option<NodeId>,
    pub preceding_sibling: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub content: Vec<Content>,
}

impl ElementNode {
    pub fn attribute(&self, qualified: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.qualified() == qualified)
            .map(|a| a.value.as_str())
    }

    pub fn attribute_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.is(namespace, local))
            .map(|a| a.value.as_str())
    }

    /// Attribute in no namespace
    pub fn attribute_plain(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<ElementNode>,
}

impl XmlDocument {
    pub(crate) fn from_nodes(nodes: Vec<ElementNode>) -> Self {
        Self { nodes }
    }

    /// The root element; readers never build an empty document
    pub fn root(&self) -> &ElementNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> &ElementNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All elements in document order
    pub fn iter(&self) -> impl Iterator<Item = &ElementNode> {
        self.nodes.iter()
    }

    pub fn parent(&self, node: &ElementNode) -> Option<&ElementNode> {
        node.parent.map(|id| &self.nodes[id])
    }

    pub fn preceding_sibling(&self, node: &ElementNode) -> Option<&ElementNode> {
        node.preceding_sibling.map(|id| &self.nodes[id])
    }

    /// Ancestors, nearest first, excluding `node`
    pub fn ancestors<'a>(&'a self, node: &'a ElementNode) -> impl Iterator<Item = &'a ElementNode> {
        std::iter::successors(self.parent(node), move |n| self.parent(n))
    }

    /// Namespace declarations visible at `node`, nearest first
    pub fn in_scope_namespaces<'a>(
        &'a self,
        node: &'a ElementNode,
    ) -> impl Iterator<Item = &'a Namespace> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .flat_map(|n| n.namespaces.iter())
    }

    /// Nearest value of a namespaced attribute on `node` or an ancestor
    pub fn inherited_attribute_ns<'a>(
        &'a self,
        node: &'a ElementNode,
        namespace: &str,
        local: &str,
    ) -> Option<&'a str> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find_map(|n| n.attribute_ns(namespace, local))
    }

    /// Nearest value of a no-namespace attribute on `node` or an ancestor
    pub fn inherited_attribute_plain<'a>(
        &'a self,
        node: &'a ElementNode,
        local: &str,
    ) -> Option<&'a str> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find_map(|n| n.attribute_plain(local))
    }

    /// Whether `xml:space="preserve"` is in effect for `node`
    pub fn preserves_space(&self, node: &ElementNode) -> bool {
        self.inherited_attribute_ns(node, XML_NAMESPACE, "space") == Some("preserve")
    }
}
