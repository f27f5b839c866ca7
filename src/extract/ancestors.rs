//! Ancestor and attribute aggregation
//!
//! At element end a second walk goes from the element up to the root. On the
//! way up the nearest value wins for inherited fields; on the way back down
//! the ancestor chain is recorded top to bottom.

use crate::core::error::Result;
use crate::extract::context::DocumentContext;
use crate::extract::pipeline::ElementExtractor;
use crate::extract::record::FieldRecord;
use crate::parse::{ElementNode, Namespace, XmlDocument};
use tracing::warn;

pub struct AncestorExtractor;

fn namespace_field(prefix: &str, ns: &Namespace) -> String {
    match &ns.prefix {
        Some(p) => format!("{}_{}", prefix, p),
        None => prefix.to_string(),
    }
}

impl AncestorExtractor {
    fn aggregate(
        document: &XmlDocument,
        ctx: &DocumentContext<'_>,
        node: &ElementNode,
        is_self: bool,
        record: &mut FieldRecord,
    ) {
        for attr in &node.attributes {
            let field = attr.name.field_name();
            record.add_if_absent(&format!("ia_{}", field), &attr.value);
            if !is_self {
                record.add_if_absent(&format!("aa_{}", field), &attr.value);
            }
        }
        match document.parent(node) {
            Some(parent) => Self::aggregate(document, ctx, parent, false, record),
            None => {
                for attr in &node.attributes {
                    record.set(format!("ra_{}", attr.name.field_name()), attr.value.as_str());
                }
                record.set("rname", node.name.qualified());
            }
        }

        if !is_self {
            record.add("aname", node.name.qualified());
            if let Some(id) = ctx.element_id(node.id) {
                record.add("aid", id);
            }
        }
    }
}

impl ElementExtractor for AncestorExtractor {
    fn name(&self) -> &'static str {
        "ancestors"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn provides(&self) -> &'static [&'static str] {
        &["name", "rname", "aname", "aid", "depth", "position", "sname", "sid"]
    }

    fn end(
        &self,
        node: &ElementNode,
        ctx: &mut DocumentContext<'_>,
        record: &mut FieldRecord,
    ) -> Result<()> {
        let document = ctx.document;

        record.set("name", node.name.qualified());
        for attr in &node.attributes {
            record.set(format!("a_{}", attr.name.field_name()), attr.value.as_str());
        }
        for ns in &node.namespaces {
            record.set(namespace_field("ns", ns), ns.uri.as_str());
        }
        record.set("depth", node.depth.to_string());
        record.set("position", node.ordinal.to_string());

        Self::aggregate(document, ctx, node, true, record);
        for ns in document.in_scope_namespaces(node) {
            record.add_if_absent(&namespace_field("ins", ns), &ns.uri);
        }

        match document.preceding_sibling(node) {
            Some(sibling) => {
                record.set("sname", sibling.name.qualified());
                if let Some(id) = ctx.element_id(sibling.id) {
                    record.set("sid", id);
                }
                for attr in &sibling.attributes {
                    record.set(format!("sa_{}", attr.name.field_name()), attr.value.as_str());
                }
            }
            None if node.ordinal > 1 => {
                warn!(
                    path = %ctx.info.path,
                    pos = %node.position,
                    "Element has no preceding sibling despite ordinal > 1"
                );
            }
            None => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ReuseConfig;
    use crate::extract::context::DocumentInfo;
    use crate::extract::identity::IdentityExtractor;
    use crate::extract::pipeline::Pipeline;
    use crate::parse::parse_document;

    fn extract(xml: &str) -> Vec<FieldRecord> {
        let doc = parse_document("t.xml", xml).unwrap();
        let base: FieldRecord = [("repo", "r"), ("path", "/t.xml"), ("rev", "3")]
            .into_iter()
            .collect();
        let info = DocumentInfo::from_base(&base, &ReuseConfig::default()).unwrap();
        let mut ctx = DocumentContext::new(&doc, &base, info);
        let pipeline =
            Pipeline::new(vec![Box::new(IdentityExtractor), Box::new(AncestorExtractor)]).unwrap();
        pipeline.run(&mut ctx).unwrap().records
    }

    fn by_name<'a>(records: &'a [FieldRecord], name: &str) -> &'a FieldRecord {
        records.iter().find(|r| r.first("name") == Some(name)).unwrap()
    }

    const DOC: &str = r#"<doc xmlns:x="urn:x" lang="sv" x:a="root">
<section lang="en" class="s"><p class="p" x:a="p"/><note/></section>
</doc>"#;

    #[test]
    fn test_inherited_nearest_wins_and_self_first() {
        let records = extract(DOC);
        let p = by_name(&records, "p");

        assert_eq!(p.get("ia_lang"), ["en"]);
        assert_eq!(p.get("ia_class"), ["p"]);
        assert_eq!(p.get("aa_class"), ["s"]);
        assert_eq!(p.get("ia_x.a"), ["p"]);
        assert_eq!(p.get("aa_x.a"), ["root"]);
        assert_eq!(p.get("a_class"), ["p"]);
        assert_eq!(p.get("ra_lang"), ["sv"]);
        assert_eq!(p.get("rname"), ["doc"]);
        assert_eq!(p.get("depth"), ["3"]);
        assert_eq!(p.get("position"), ["1"]);
    }

    #[test]
    fn test_ancestor_chain_top_down() {
        let records = extract(DOC);
        let p = by_name(&records, "p");
        assert_eq!(p.get("aname"), ["doc", "section"]);
        assert_eq!(p.get("aid"), ["r^/t.xml?p=3|000001", "r^/t.xml?p=3|000002"]);

        let root = by_name(&records, "doc");
        assert!(root.get("aname").is_empty());
        assert_eq!(root.get("ia_lang"), ["sv"]);
        assert!(root.get("aa_lang").is_empty());
    }

    #[test]
    fn test_namespaces_declared_and_in_scope() {
        let records = extract(DOC);
        let root = by_name(&records, "doc");
        let p = by_name(&records, "p");
        assert_eq!(root.get("ns_x"), ["urn:x"]);
        assert!(p.get("ns_x").is_empty());
        assert_eq!(p.get("ins_x"), ["urn:x"]);
    }

    #[test]
    fn test_preceding_sibling_fields() {
        let records = extract(DOC);
        let note = by_name(&records, "note");
        assert_eq!(note.get("sname"), ["p"]);
        assert_eq!(note.get("sid"), ["r^/t.xml?p=3|000003"]);
        assert_eq!(note.get("sa_class"), ["p"]);
        assert!(!by_name(&records, "p").contains("sname"));
    }
}
