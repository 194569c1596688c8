//! Page assembly from HTML files
//!
//! Frame documents are supplied with `--frame SELECTOR=PATH[@URL]`. A selector
//! may name a nested frame by joining the selectors of its ancestors with
//! ` >> `, provided the ancestors were given earlier on the command line.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anchor_locator::FRAME_SEPARATOR;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use tracing::debug;
use url::Url;
use waypoint_dom_snapshot::{DocumentId, Page};

/// One frame document to attach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSpec {
    /// Frame selector chain, outermost first
    pub selector: String,
    pub path: PathBuf,
    /// Frame URL; decides the frame's origin
    pub url: Option<String>,
}

impl FrameSpec {
    /// Selector chain split into (host chain, iframe selector)
    fn split_selector(&self) -> (String, &str) {
        match self.selector.rsplit_once(FRAME_SEPARATOR) {
            Some((parent, last)) => (parent.trim().to_string(), last.trim()),
            None => (String::new(), self.selector.trim()),
        }
    }
}

impl FromStr for FrameSpec {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let split = separator_index(raw)
            .ok_or_else(|| format!("expected SELECTOR=PATH[@URL], got '{raw}'"))?;
        let (selector, rest) = (&raw[..split], &raw[split + 1..]);
        let (path, url) = match rest.rsplit_once('@') {
            Some((path, url)) if looks_like_url(url.trim()) => (path, Some(url.trim().to_string())),
            _ => (rest, None),
        };
        let selector = selector.trim();
        let path = path.trim();
        if selector.is_empty() || path.is_empty() {
            return Err(format!("expected SELECTOR=PATH[@URL], got '{raw}'"));
        }
        Ok(Self {
            selector: selector.to_string(),
            path: PathBuf::from(path),
            url: url.filter(|url| !url.is_empty()),
        })
    }
}

/// Absolute URL, or a root-relative reference resolved against the parent document
fn looks_like_url(raw: &str) -> bool {
    raw.starts_with('/') || Url::parse(raw).is_ok()
}

/// First `=` outside attribute brackets
fn separator_index(raw: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, ch) in raw.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '=' if depth == 0 => return Some(index),
            _ => {}
        }
    }
    None
}

/// Page arguments shared by every command
#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    /// HTML file of the top-level document
    #[arg(long, value_name = "FILE")]
    pub html: PathBuf,

    /// URL the top-level document was served from
    #[arg(long)]
    pub url: Option<String>,

    /// Frame document as SELECTOR=PATH[@URL]; repeatable
    #[arg(long = "frame", value_name = "SPEC")]
    pub frames: Vec<FrameSpec>,
}

impl PageArgs {
    pub fn load(&self) -> Result<Page> {
        load_page(&self.html, self.url.as_deref(), &self.frames)
    }
}

/// Parse the top document and attach every frame spec in order
pub fn load_page(html: &Path, url: Option<&str>, frames: &[FrameSpec]) -> Result<Page> {
    let markup = read_html(html)?;
    let mut page = match url {
        Some(url) => Page::parse_with_url(&markup, url)
            .with_context(|| format!("invalid page URL for {}", html.display()))?,
        None => Page::parse(&markup),
    };

    let mut attached: HashMap<String, DocumentId> = HashMap::new();
    attached.insert(String::new(), DocumentId::TOP);
    for spec in frames {
        let (parent_chain, iframe) = spec.split_selector();
        let parent = *attached.get(&parent_chain).ok_or_else(|| {
            anyhow!(
                "frame '{}' is nested in '{}', which was not loaded before it",
                spec.selector,
                parent_chain
            )
        })?;
        let markup = read_html(&spec.path)?;
        let id = page
            .attach_frame(parent, iframe, &markup, spec.url.as_deref())
            .with_context(|| format!("cannot attach frame '{}'", spec.selector))?;
        debug!(frame = %spec.selector, document = %id, path = %spec.path.display(), "frame attached");
        let key = if parent_chain.is_empty() {
            iframe.to_string()
        } else {
            format!("{parent_chain}{FRAME_SEPARATOR}{iframe}")
        };
        attached.insert(key, id);
    }
    Ok(page)
}

fn read_html(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn frame_spec_parses_selector_path_and_url() {
        let spec: FrameSpec = "iframe[name=\"chat\"]=chat.html@https://help.example.com/chat"
            .parse()
            .unwrap();
        assert_eq!(spec.selector, "iframe[name=\"chat\"]");
        assert_eq!(spec.path, PathBuf::from("chat.html"));
        assert_eq!(spec.url.as_deref(), Some("https://help.example.com/chat"));

        let with_query: FrameSpec = "#chat=chat.html@/chat?lang=en".parse().unwrap();
        assert_eq!(with_query.url.as_deref(), Some("/chat?lang=en"));

        let at_in_path: FrameSpec = "#f=assets/icons@2x/frame.html".parse().unwrap();
        assert_eq!(at_in_path.path, PathBuf::from("assets/icons@2x/frame.html"));
        assert_eq!(at_in_path.url, None);

        let both: FrameSpec = "#f=build@v2/frame.html@https://app.example.com/f".parse().unwrap();
        assert_eq!(both.path, PathBuf::from("build@v2/frame.html"));
        assert_eq!(both.url.as_deref(), Some("https://app.example.com/f"));

        let plain: FrameSpec = "#editor=editor.html".parse().unwrap();
        assert_eq!(plain.url, None);
        assert!("editor.html".parse::<FrameSpec>().is_err());
        assert!("=editor.html".parse::<FrameSpec>().is_err());
    }

    #[test]
    fn nested_frames_attach_to_their_hosts() {
        let dir = tempdir().unwrap();
        let top = dir.path().join("top.html");
        let outer = dir.path().join("outer.html");
        let inner = dir.path().join("inner.html");
        fs::write(&top, "<iframe id='outer'></iframe>").unwrap();
        fs::write(&outer, "<iframe class='inner'></iframe>").unwrap();
        fs::write(&inner, "<b>deep</b>").unwrap();

        let frames: Vec<FrameSpec> = vec![
            format!("#outer={}", outer.display()).parse().unwrap(),
            format!("#outer >> .inner={}", inner.display()).parse().unwrap(),
        ];
        let page = load_page(&top, None, &frames).unwrap();
        assert_eq!(page.len(), 3);
        let deep = page.document(DocumentId(2)).unwrap();
        assert_eq!(deep.nesting_depth(), 2);
        assert!(deep.query_selector("b").unwrap().is_some());
    }

    #[test]
    fn nested_frame_without_host_is_rejected() {
        let dir = tempdir().unwrap();
        let top = dir.path().join("top.html");
        fs::write(&top, "<iframe id='outer'></iframe>").unwrap();
        let frames: Vec<FrameSpec> = vec![format!("#outer >> iframe={}", top.display()).parse().unwrap()];
        let err = load_page(&top, None, &frames).unwrap_err();
        assert!(err.to_string().contains("not loaded before it"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_page(Path::new("/nonexistent/page.html"), None, &[]).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
