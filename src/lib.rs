//! Waypoint command line library
//!
//! Exposes the command implementations and page loading helpers used by the
//! `waypoint` binary and its integration tests.

pub mod cli;
pub mod page_loader;
pub mod telemetry;

pub use page_loader::{load_page, FrameSpec, PageArgs};
pub use telemetry::init_tracing;
