//! Normalization stage run on raw XML before it is parsed
//!
//! The pipeline treats this as an opaque raw-in/normalized-out transform.
//! `XmlNormalizer` is the built-in one: it strips comments, doctype and
//! non-marker processing instructions, and drops whitespace-only text that
//! only exists because of source formatting.

use crate::core::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use tracing::debug;

/// Parameters handed to the normalizer along with the raw document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeParams {
    pub document_status: Option<String>,
    pub path_area: Option<String>,
    pub depth_limit: Option<u32>,
}

pub trait Normalizer: Send + Sync {
    fn normalize(&self, path: &str, raw: &str, params: &NormalizeParams) -> Result<String>;
}

#[derive(Debug, Clone, Default)]
pub struct XmlNormalizer {
    marker_pis: Vec<String>,
}

impl XmlNormalizer {
    pub fn new(marker_pis: Vec<String>) -> Self {
        Self { marker_pis }
    }
}

impl Normalizer for XmlNormalizer {
    fn normalize(&self, path: &str, raw: &str, params: &NormalizeParams) -> Result<String> {
        debug!(
            path,
            status = params.document_status.as_deref().unwrap_or(""),
            area = params.path_area.as_deref().unwrap_or(""),
            depth_limit = params.depth_limit,
            "Normalizing"
        );

        let mut reader = Reader::from_str(raw);
        reader.config_mut().trim_text(false);
        let mut writer = Writer::new(Vec::with_capacity(raw.len()));
        // xml:space="preserve" per open element
        let mut preserve: Vec<bool> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| Error::malformed(path, e))?;
            let keep = match &event {
                Event::Start(e) => {
                    let inherited = preserve.last().copied().unwrap_or(false);
                    let mut space = inherited;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"xml:space" {
                            space = attr.value.as_ref() == b"preserve";
                        }
                    }
                    preserve.push(space);
                    true
                }
                Event::End(_) => {
                    preserve.pop();
                    true
                }
                Event::Text(e) => {
                    let bytes: &[u8] = e;
                    let formatting = bytes.iter().all(u8::is_ascii_whitespace)
                        && bytes.iter().any(|b| *b == b'\n' || *b == b'\r');
                    // Outside the root element nothing is preserved
                    !formatting || preserve.last().copied().unwrap_or(false)
                }
                Event::PI(e) => self
                    .marker_pis
                    .iter()
                    .any(|target| target.as_bytes() == e.target()),
                Event::Comment(_) | Event::DocType(_) => false,
                Event::Eof => break,
                _ => true,
            };

            if keep {
                writer
                    .write_event(event)
                    .map_err(|e| Error::malformed(path, e))?;
            }
        }

        String::from_utf8(writer.into_inner()).map_err(|e| Error::malformed(path, e))
    }
}
