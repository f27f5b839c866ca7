//! Error types for xmldex

use thiserror::Error;

/// Result type alias using xmldex's Error
pub type Result<T> = std::result::Result<T, Error>;

/// xmldex error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed XML in {path}: {message}")]
    MalformedXml { path: String, message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Extractor {extractor} failed: {message}")]
    Extractor {
        extractor: &'static str,
        message: String,
    },

    #[error("Extractor {extractor} requires field {field} which no earlier extractor provides")]
    PipelineOrder {
        extractor: &'static str,
        field: &'static str,
    },

    #[error("Invalid tree position: {value:?}")]
    InvalidTreePosition { value: String },

    #[error("Element identifier requested before document start")]
    IdentityNotStarted,

    #[error("Index error: {message}")]
    IndexError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl Error {
    pub(crate) fn malformed(path: &str, message: impl std::fmt::Display) -> Self {
        Error::MalformedXml {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn extractor(extractor: &'static str, message: impl Into<String>) -> Self {
        Error::Extractor {
            extractor,
            message: message.into(),
        }
    }

    /// Errors that abort only the document being indexed. Anything else
    /// (index or IO failures) stops the whole change set.
    pub fn is_document_local(&self) -> bool {
        matches!(
            self,
            Error::MalformedXml { .. }
                | Error::MissingField { .. }
                | Error::Extractor { .. }
                | Error::InvalidTreePosition { .. }
                | Error::IdentityNotStarted
                | Error::Xml(_)
        )
    }
}
