//! Reuse-relevant rendering of an element subtree
//!
//! The rendering is what the reuse checksum is computed over. It keeps
//! element names, text and the `translate` marker, and nothing else:
//!
//! * whitespace-only text containing a line break is dropped, as are leading
//!   and trailing whitespace runs with a line break; every other whitespace run
//!   becomes a single space. Text under `xml:space="preserve"` is verbatim.
//! * placeholder elements keep their tag but lose their content.
//! * marker processing instructions render as `<?target?>`; others vanish.

use crate::core::config::ReuseConfig;
use crate::core::error::Result;
use crate::extract::context::DocumentContext;
use crate::extract::pipeline::ElementExtractor;
use crate::extract::record::FieldRecord;
use crate::parse::{Content, ElementNode, XmlDocument};
use quick_xml::escape::escape;
use std::collections::HashSet;

pub const TRANSLATE_ATTRIBUTE: &str = "translate";

#[derive(Debug, Clone, Default)]
pub struct RenderRules {
    placeholders: HashSet<String>,
    markers: HashSet<String>,
}

impl RenderRules {
    pub fn new(config: &ReuseConfig) -> Self {
        Self {
            placeholders: config.placeholder_elements.iter().cloned().collect(),
            markers: config.marker_pis.iter().cloned().collect(),
        }
    }
}

/// Append `text` with whitespace normalized
fn push_text(text: &str, preserve: bool, out: &mut String) {
    if preserve {
        out.push_str(&escape(text));
        return;
    }

    let mut rest = text;
    let mut leading = true;
    while !rest.is_empty() {
        let ws_len = rest
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(rest.len());
        if ws_len > 0 {
            let run = &rest[..ws_len];
            let trailing = ws_len == rest.len();
            let line_break = run.contains('\n') || run.contains('\r');
            if !(line_break && (leading || trailing)) {
                out.push(' ');
            }
            rest = &rest[ws_len..];
            continue;
        }

        let word_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        out.push_str(&escape(&rest[..word_len]));
        rest = &rest[word_len..];
        leading = false;
    }
}

fn render_element(
    document: &XmlDocument,
    node: &ElementNode,
    rules: &RenderRules,
    top: bool,
    out: &mut String,
) {
    let name = node.name.qualified();
    out.push('<');
    out.push_str(&name);

    // The rendered top element carries the marker it inherits
    let translate = if top {
        document.inherited_attribute_plain(node, TRANSLATE_ATTRIBUTE)
    } else {
        node.attribute_plain(TRANSLATE_ATTRIBUTE)
    };
    if let Some(value) = translate {
        out.push_str(" translate=\"");
        out.push_str(&escape(value));
        out.push('"');
    }

    if node.content.is_empty() || rules.placeholders.contains(&node.name.local) {
        out.push_str("/>");
        return;
    }
    out.push('>');

    let preserve = document.preserves_space(node);
    for content in &node.content {
        match content {
            Content::Text(text) => push_text(text, preserve, out),
            Content::Element(child) => {
                render_element(document, document.node(*child), rules, false, out)
            }
            Content::Pi(target) if rules.markers.contains(target) => {
                out.push_str("<?");
                out.push_str(target);
                out.push_str("?>");
            }
            Content::Pi(_) => {}
        }
    }

    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

pub fn render_reuse(document: &XmlDocument, node: &ElementNode, rules: &RenderRules) -> String {
    let mut out = String::new();
    render_element(document, node, rules, true, &mut out);
    out
}

/// Whitespace-normalized text of the subtree, tags removed
pub fn plain_text(document: &XmlDocument, node: &ElementNode) -> String {
    fn collect(document: &XmlDocument, node: &ElementNode, out: &mut String) {
        for content in &node.content {
            match content {
                Content::Text(text) => out.push_str(text),
                Content::Element(child) => {
                    out.push(' ');
                    collect(document, document.node(*child), out);
                    out.push(' ');
                }
                Content::Pi(_) => {}
            }
        }
    }

    let mut raw = String::new();
    collect(document, node, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Writes `reuse_text`, the input of the reuse checksum
pub struct ReuseContentExtractor {
    rules: RenderRules,
}

impl ReuseContentExtractor {
    pub fn new(config: &ReuseConfig) -> Self {
        Self {
            rules: RenderRules::new(config),
        }
    }
}

impl ElementExtractor for ReuseContentExtractor {
    fn name(&self) -> &'static str {
        "reuse_content"
    }

    fn provides(&self) -> &'static [&'static str] {
        &["reuse_text"]
    }

    fn end(
        &self,
        node: &ElementNode,
        ctx: &mut DocumentContext<'_>,
        record: &mut FieldRecord,
    ) -> Result<()> {
        record.set("reuse_text", render_reuse(ctx.document, node, &self.rules));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_document;

    fn render(xml: &str) -> String {
        let doc = parse_document("t.xml", xml).unwrap();
        render_reuse(&doc, doc.root(), &RenderRules::new(&ReuseConfig::default()))
    }

    fn render_first(xml: &str, local: &str) -> String {
        let doc = parse_document("t.xml", xml).unwrap();
        let node = doc.iter().find(|n| n.name.local == local).unwrap();
        render_reuse(&doc, node, &RenderRules::new(&ReuseConfig::default()))
    }

    #[test]
    fn test_inline_sibling_spacing() {
        assert_eq!(
            render("<p>Ett <code>a</code><code>b</code> <code>c</code>  <code>d</code></p>"),
            "<p>Ett <code>a</code><code>b</code> <code>c</code> <code>d</code></p>"
        );
    }

    #[test]
    fn test_source_formatting_removed() {
        assert_eq!(
            render("<p>\n    Ett <code>a</code>\n    <code>b</code>\n</p>"),
            "<p>Ett <code>a</code><code>b</code></p>"
        );
        assert_eq!(render("<p>one\n   two   three</p>"), "<p>one two three</p>");
    }

    #[test]
    fn test_preserve_space_verbatim() {
        assert_eq!(
            render("<pre xml:space=\"preserve\">  a\n  b </pre>"),
            "<pre>  a\n  b </pre>"
        );
    }

    #[test]
    fn test_placeholder_content_excluded() {
        let with_a = render("<p>Press <ph>Ctrl</ph> now</p>");
        let with_b = render("<p>Press <ph>Cmd</ph> now</p>");
        assert_eq!(with_a, "<p>Press <ph/> now</p>");
        assert_eq!(with_a, with_b);
        assert_ne!(with_a, render("<p>Press now</p>"));
    }

    #[test]
    fn test_translate_marker_inherited() {
        let xml = r#"<doc translate="no"><p>x</p></doc>"#;
        assert_eq!(render_first(xml, "p"), r#"<p translate="no">x</p>"#);
        assert_ne!(render_first(xml, "p"), render("<p>x</p>"));
    }

    #[test]
    fn test_other_attributes_and_pis_ignored() {
        assert_eq!(render(r#"<p class="a" id="1">x<?edit y?></p>"#), "<p>x</p>");
    }

    #[test]
    fn test_plain_text() {
        let doc = parse_document("t.xml", "<p>Hello <b>big</b>\n  world</p>").unwrap();
        assert_eq!(plain_text(&doc, doc.root()), "Hello big world");
    }
}
