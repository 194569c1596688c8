//! Error types for locator system

use thiserror::Error;
use waypoint_dom_snapshot::{DomError, FrameAccessError};

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocatorError {
    /// Every selector profile failed for the leaf element
    #[error("cannot create a stable locator for {0}")]
    Unanchorable(String),

    /// One profile found no unique selector within its effort bounds
    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    /// Target cannot be resolved as given
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// Frame could not be entered
    #[error("frame access failed: {0}")]
    FrameAccess(#[from] FrameAccessError),

    /// Query against the document failed
    #[error("document error: {0}")]
    Dom(#[from] DomError),
}

impl LocatorError {
    /// Errors that are contained where they happen and never end a call
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            LocatorError::SelectorNotFound(_)
                | LocatorError::FrameAccess(_)
                | LocatorError::Dom(_)
        )
    }

    /// Get error severity (0=low, 1=medium, 2=high)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::Unanchorable(_) | LocatorError::InvalidTarget(_) => 2,
            LocatorError::FrameAccess(_) => 1,
            LocatorError::SelectorNotFound(_) | LocatorError::Dom(_) => 0,
        }
    }
}
