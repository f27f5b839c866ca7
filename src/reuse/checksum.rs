use crate::core::error::{Error, Result};
use crate::extract::context::DocumentContext;
use crate::extract::pipeline::ElementExtractor;
use crate::extract::record::FieldRecord;
use crate::parse::ElementNode;
use xxhash_rust::xxh3::xxh3_128;

/// Hex checksum of a reuse rendering
pub fn reuse_checksum(reuse_text: &str) -> String {
    format!("{:032x}", xxh3_128(reuse_text.as_bytes()))
}

/// Hashes `reuse_text` into `reuse_checksum`
pub struct ReuseChecksumExtractor;

impl ElementExtractor for ReuseChecksumExtractor {
    fn name(&self) -> &'static str {
        "reuse_checksum"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["reuse_text"]
    }

    fn provides(&self) -> &'static [&'static str] {
        &["reuse_checksum"]
    }

    fn end(
        &self,
        _node: &ElementNode,
        _ctx: &mut DocumentContext<'_>,
        record: &mut FieldRecord,
    ) -> Result<()> {
        let text = record
            .first("reuse_text")
            .ok_or_else(|| Error::extractor(self.name(), "reuse_text missing on record"))?;
        let checksum = reuse_checksum(text);
        record.set("reuse_checksum", checksum);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_format() {
        let sum = reuse_checksum("<p>x</p>");
        assert_eq!(sum.len(), 32);
        assert!(sum.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(sum, reuse_checksum("<p>x</p>"));
        assert_ne!(sum, reuse_checksum("<p translate=\"no\">x</p>"));
    }
}
