//! Error types for document snapshots

use thiserror::Error;

use crate::page::DocumentId;

/// Errors raised while building or querying a page snapshot
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    /// Selector failed to parse
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// Frame or page URL failed to parse
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Document id does not belong to this page
    #[error("unknown document: {0}")]
    UnknownDocument(DocumentId),

    /// No iframe matched the selector used to attach a frame
    #[error("no iframe matches '{0}'")]
    FrameNotFound(String),
}

impl DomError {
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True when the error comes from caller-supplied selector syntax
    pub fn is_selector_syntax(&self) -> bool {
        matches!(self, DomError::InvalidSelector { .. })
    }
}

/// Outcome of trying to read an iframe's content document
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameAccessError {
    /// Frame document lives in another origin
    #[error("frame access denied for {frame} (origin {origin})")]
    Denied { frame: String, origin: String },

    /// Handle does not point at an iframe of this document
    #[error("element <{0}> is not an iframe of this document")]
    NotAnIframe(String),
}

impl FrameAccessError {
    pub fn is_denied(&self) -> bool {
        matches!(self, FrameAccessError::Denied { .. })
    }
}
