//! XML reader building the element arena in one depth-first pass

use crate::core::error::{Error, Result};
use crate::parse::node::{
    Attribute, Content, ElementNode, Namespace, NodeId, QName, XmlDocument, XML_NAMESPACE,
};
use crate::parse::position::TreePosition;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

struct OpenElement {
    id: NodeId,
    children: u32,
    last_child: Option<NodeId>,
}

/// Parses normalized XML into an `XmlDocument`
pub struct XmlReader<'a> {
    path: &'a str,
    nodes: Vec<ElementNode>,
    open: Vec<OpenElement>,
    /// Namespaces declared per open element, innermost last
    scopes: Vec<Vec<Namespace>>,
    root_closed: bool,
}

impl<'a> XmlReader<'a> {
    /// `path` is only used in error messages
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            nodes: Vec::new(),
            open: Vec::new(),
            scopes: Vec::new(),
            root_closed: false,
        }
    }

    pub fn read(mut self, input: &str) -> Result<XmlDocument> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(false);

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::malformed(
                    self.path,
                    format!("{} at byte {}", e, reader.buffer_position()),
                )
            })?;

            match event {
                Event::Start(e) => self.start_element(&e)?,
                Event::Empty(e) => {
                    self.start_element(&e)?;
                    self.end_element();
                }
                Event::End(_) => self.end_element(),
                Event::Text(e) => {
                    let text = e.unescape().map_err(|e| Error::malformed(self.path, e))?;
                    self.text(&text)?;
                }
                Event::CData(e) => {
                    let raw = e.into_inner();
                    let text =
                        std::str::from_utf8(&raw).map_err(|e| Error::malformed(self.path, e))?;
                    self.text(text)?;
                }
                Event::PI(e) => {
                    let target = String::from_utf8_lossy(e.target()).into_owned();
                    if let Some(open) = self.open.last() {
                        self.nodes[open.id].content.push(Content::Pi(target));
                    }
                }
                Event::Eof => break,
                Event::Comment(_) | Event::Decl(_) | Event::DocType(_) => {}
            }
        }

        if !self.open.is_empty() {
            let name = self.nodes[self.open[self.open.len() - 1].id].name.qualified();
            return Err(Error::malformed(
                self.path,
                format!("unexpected end of document, <{}> not closed", name),
            ));
        }
        if self.nodes.is_empty() {
            return Err(Error::malformed(self.path, "no root element"));
        }

        Ok(XmlDocument::from_nodes(self.nodes))
    }

    fn start_element(&mut self, e: &BytesStart<'_>) -> Result<()> {
        if self.root_closed {
            return Err(Error::malformed(self.path, "content after the root element"));
        }

        let raw_name = decode(self.path, e.name().as_ref())?;

        let mut declared = Vec::new();
        let mut raw_attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| Error::malformed(self.path, e))?;
            let key = decode(self.path, attr.key.as_ref())?;
            let value = attr
                .unescape_value()
                .map_err(|e| Error::malformed(self.path, e))?
                .into_owned();

            if key == "xmlns" {
                declared.push(Namespace { prefix: None, uri: value });
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declared.push(Namespace {
                    prefix: Some(prefix.to_string()),
                    uri: value,
                });
            } else {
                raw_attributes.push((key, value));
            }
        }
        self.scopes.push(declared.clone());

        let name = self.resolve(&raw_name, true)?;
        let attributes = raw_attributes
            .into_iter()
            .map(|(key, value)| {
                Ok(Attribute {
                    name: self.resolve(&key, false)?,
                    value,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let id = self.nodes.len();
        let (parent, ordinal, preceding_sibling, position) = match self.open.last_mut() {
            Some(parent) => {
                parent.children += 1;
                let preceding = parent.last_child.replace(id);
                let position =
                    TreePosition::child(&self.nodes[parent.id].position, parent.children);
                (Some(parent.id), parent.children, preceding, position)
            }
            None => (None, 1, None, TreePosition::root(1)),
        };

        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
            self.nodes[parent].content.push(Content::Element(id));
        }

        self.nodes.push(ElementNode {
            id,
            name,
            depth: self.open.len() as u32 + 1,
            ordinal,
            position,
            attributes,
            namespaces: declared,
            parent,
            preceding_sibling,
            children: Vec::new(),
            content: Vec::new(),
        });
        self.open.push(OpenElement {
            id,
            children: 0,
            last_child: None,
        });
        Ok(())
    }

    fn end_element(&mut self) {
        self.open.pop();
        self.scopes.pop();
        if self.open.is_empty() {
            self.root_closed = true;
        }
    }

    fn text(&mut self, text: &str) -> Result<()> {
        let Some(open) = self.open.last() else {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(Error::malformed(self.path, "text outside the root element"));
        };

        let content = &mut self.nodes[open.id].content;
        if let Some(Content::Text(previous)) = content.last_mut() {
            previous.push_str(text);
        } else {
            content.push(Content::Text(text.to_string()));
        }
        Ok(())
    }

    fn resolve(&self, raw: &str, is_element: bool) -> Result<QName> {
        let (prefix, local) = match raw.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, raw),
        };

        let namespace = match prefix {
            Some("xml") => Some(XML_NAMESPACE.to_string()),
            Some(prefix) => Some(self.lookup(Some(prefix)).ok_or_else(|| {
                Error::malformed(self.path, format!("undeclared namespace prefix {:?}", prefix))
            })?),
            // Unprefixed attributes are never in the default namespace
            None if is_element => self.lookup(None),
            None => None,
        };

        Ok(QName {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
            namespace,
        })
    }

    fn lookup(&self, prefix: Option<&str>) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|ns| ns.prefix.as_deref() == prefix)
            .map(|ns| ns.uri.clone())
            .filter(|uri| !uri.is_empty())
    }
}

fn decode(path: &str, bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::malformed(path, e))
}

/// Parse a whole document
pub fn parse_document(path: &str, input: &str) -> Result<XmlDocument> {
    XmlReader::new(path).read(input)
}
