use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Result of a command that ran without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// Nothing matched; not an error, but scripts need to tell
    NotFound,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Done => 0,
            Outcome::NotFound => 2,
        }
    }
}

/// Pretty JSON to `path`, or to stdout when no path is given
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let mut rendered = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    rendered.push('\n');
    match path {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display())),
        None => io::stdout()
            .lock()
            .write_all(rendered.as_bytes())
            .context("failed to write to stdout"),
    }
}
