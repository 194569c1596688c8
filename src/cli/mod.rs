pub mod capture;
pub mod frames;
pub mod output;
pub mod resolve;

pub use capture::{cmd_capture, CaptureArgs};
pub use frames::{cmd_frames, FramesArgs};
pub use output::{write_json, Outcome};
pub use resolve::{cmd_resolve, ResolveArgs};
