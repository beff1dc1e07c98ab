use thiserror::Error;

use crate::Dialect;

/// Why a document produced no tree. Callers only ever see the empty tree.
#[derive(Debug, Error)]
pub(crate) enum DecodeError {
    #[error("contract document not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("xml escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("element <{0}> is never closed")]
    UnclosedElement(String),

    #[error("document has no root element")]
    NoRoot,
}

impl DecodeError {
    /// Missing input, as opposed to input that failed to parse.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The document carries a dialect marker but lacks a required substructure.
    #[error("unrecognized {dialect} document: missing {path}")]
    Structure {
        dialect: Dialect,
        path: &'static str,
    },
}
