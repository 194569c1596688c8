use anchor_locator::Locator;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use waypoint_dom_snapshot::DocumentId;

use crate::cli::output::{write_json, Outcome};
use crate::page_loader::PageArgs;

#[derive(Args, Debug, Clone)]
pub struct FramesArgs {
    #[command(flatten)]
    pub page: PageArgs,
}

/// One accessible document as printed by `frames`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameEntry {
    pub document: DocumentId,
    pub frame_selector: String,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

pub fn cmd_frames(args: FramesArgs, locator: &Locator) -> Result<Outcome> {
    let page = args.page.load()?;
    let entries: Vec<FrameEntry> = locator
        .enumerate_documents(page.top())
        .into_iter()
        .map(|context| FrameEntry {
            document: context.document.id(),
            url: context.document.url().map(|url| url.to_string()),
            frame_selector: context.frame_selector,
            depth: context.depth,
        })
        .collect();
    write_json(&entries, None)?;
    Ok(Outcome::Done)
}
