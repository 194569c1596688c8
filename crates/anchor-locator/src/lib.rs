//! Self-healing element locator
//!
//! This crate re-finds a previously captured element in a possibly changed
//! page:
//! - Selector candidates generated under several constraint profiles
//! - Ancestor/sibling context tree captured at authoring time
//! - Same-origin frame enumeration for cross-document search
//! - Ancestor-verified resolution with a precision-gated degraded fallback

pub mod context;
pub mod errors;
pub mod finder;
pub mod frames;
pub mod healer;
pub mod locator;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use context::*;
pub use errors::*;
pub use frames::*;
pub use healer::*;
pub use locator::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
