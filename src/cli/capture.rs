use std::path::PathBuf;

use anchor_locator::{CaptureOptions, Locator, PrecisionLevel};
use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};

use crate::cli::output::{write_json, Outcome};
use crate::page_loader::PageArgs;

#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// CSS selector of the element to capture; searched in every accessible document
    #[arg(long)]
    pub selector: String,

    /// Which match to capture when the selector matches several elements
    #[arg(long, default_value_t = 0)]
    pub index: usize,

    /// Precision a degraded match must reach (looser, loose, medium, stricter, strictest)
    #[arg(long, default_value = "medium")]
    pub precision: PrecisionLevel,

    /// Require the element's text to be unchanged when resolving
    #[arg(long)]
    pub dynamic: bool,

    /// Search nested frames when resolving
    #[arg(long)]
    pub across_frames: bool,

    /// Write the target here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn cmd_capture(args: CaptureArgs, locator: &Locator) -> Result<Outcome> {
    let page = args.page.load()?;

    let mut matches = Vec::new();
    for context in locator.enumerate_documents(page.top()) {
        let found = context
            .document
            .query_selector_all(&args.selector)
            .with_context(|| format!("invalid selector '{}'", args.selector))?;
        matches.extend(found);
    }
    if matches.len() > 1 {
        warn!(
            selector = %args.selector,
            count = matches.len(),
            index = args.index,
            "selector is ambiguous; capturing by index"
        );
    }
    let Some(element) = matches.get(args.index) else {
        bail!(
            "selector '{}' matched {} element(s); index {} is out of range",
            args.selector,
            matches.len(),
            args.index
        );
    };

    let options = CaptureOptions {
        precision_level: args.precision,
        is_dynamic_content: args.dynamic,
        search_across_frames: args.across_frames,
        sequence_index: 0,
    };
    let target = locator
        .capture(element, &options)
        .with_context(|| format!("cannot capture {element}"))?;
    info!(element = %element, "target captured");

    write_json(&target, args.output.as_deref())?;
    Ok(Outcome::Done)
}
