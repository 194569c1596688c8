//! Read-only page snapshots for element location
//!
//! A [`Page`] is one top-level document plus the frame documents attached to
//! its iframes. Everything here is a pure read over an immutable snapshot:
//! - CSS querying scoped to a single document
//! - element navigation (parent, element siblings, positional indices)
//! - capability-checked iframe access that refuses cross-origin frames

pub mod css;
pub mod document;
pub mod element;
pub mod errors;
pub mod page;

pub use document::DocumentRef;
pub use element::{ElementHandle, ElementSummary};
pub use errors::{DomError, FrameAccessError};
pub use page::{DocumentId, Page};
