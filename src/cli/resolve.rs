use std::fs;
use std::path::PathBuf;

use anchor_locator::{Locator, Target};
use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use crate::cli::output::{write_json, Outcome};
use crate::page_loader::PageArgs;

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Target JSON produced by `capture`
    #[arg(long, value_name = "FILE")]
    pub target: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn cmd_resolve(args: ResolveArgs, locator: &Locator) -> Result<Outcome> {
    let raw = fs::read_to_string(&args.target)
        .with_context(|| format!("failed to read {}", args.target.display()))?;
    let target: Target = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid target", args.target.display()))?;
    let page = args.page.load()?;

    match locator.resolve(&target, page.top()) {
        Some(result) => {
            write_json(&result.report(), args.output.as_deref())?;
            Ok(Outcome::Done)
        }
        None => {
            warn!(target = %args.target.display(), "target not found in page");
            write_json(&serde_json::Value::Null, args.output.as_deref())?;
            Ok(Outcome::NotFound)
        }
    }
}
