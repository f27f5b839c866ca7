use crate::core::error::Result;
use crate::extract::context::DocumentContext;
use crate::extract::pipeline::ElementExtractor;
use crate::extract::record::FieldRecord;
use crate::parse::ElementNode;
use crate::reuse::render::plain_text;

/// Searchable text of the element subtree plus a word count
pub struct TextExtractor;

impl ElementExtractor for TextExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn provides(&self) -> &'static [&'static str] {
        &["text", "words"]
    }

    fn end(
        &self,
        node: &ElementNode,
        ctx: &mut DocumentContext<'_>,
        record: &mut FieldRecord,
    ) -> Result<()> {
        let text = plain_text(ctx.document, node);
        record.set("words", text.split_whitespace().count().to_string());
        record.set("text", text);
        Ok(())
    }
}
