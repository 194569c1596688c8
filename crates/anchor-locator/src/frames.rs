//! Cross-document traversal
//!
//! Enumerates the root document and every same-origin frame below it,
//! depth-first. A frame that cannot be entered is skipped and the walk goes
//! on with its siblings.

use tracing::{debug, warn};
use url::Url;
use waypoint_dom_snapshot::css::{escape_ident, quote_attr_value};
use waypoint_dom_snapshot::{DocumentRef, ElementHandle, FrameAccessError};

use crate::types::DocumentContext;

/// Joins the frame selectors of nested frames
pub const FRAME_SEPARATOR: &str = " >> ";

/// Root first, then every accessible frame in pre-order.
///
/// Frames nested deeper than `max_depth` below `root` are not entered.
pub fn enumerate_documents(root: DocumentRef<'_>, max_depth: usize) -> Vec<DocumentContext<'_>> {
    let mut contexts = vec![DocumentContext::root(root)];
    visit_frames(&DocumentContext::root(root), max_depth, &mut contexts);
    debug!(root = %root.id(), documents = contexts.len(), "enumerated documents");
    contexts
}

fn visit_frames<'a>(parent: &DocumentContext<'a>, max_depth: usize, out: &mut Vec<DocumentContext<'a>>) {
    if parent.depth >= max_depth {
        if !parent.document.iframes().is_empty() {
            debug!(document = %parent.document.id(), depth = parent.depth, "frame depth limit reached");
        }
        return;
    }

    for iframe in parent.document.iframes() {
        match parent.document.content_document(&iframe) {
            Ok(Some(document)) => {
                let child = DocumentContext {
                    document,
                    frame_selector: join_frame_selector(&parent.frame_selector, &frame_selector(&iframe)),
                    depth: parent.depth + 1,
                };
                out.push(child.clone());
                visit_frames(&child, max_depth, out);
            }
            Ok(None) => {
                debug!(frame = %iframe, "iframe has no document; skipped");
            }
            Err(err @ FrameAccessError::Denied { .. }) => {
                warn!(frame = %iframe, error = %err, "inaccessible frame skipped");
            }
            Err(err) => {
                debug!(frame = %iframe, error = %err, "not a frame document; skipped");
            }
        }
    }
}

fn join_frame_selector(prefix: &str, label: &str) -> String {
    if prefix.is_empty() {
        label.to_string()
    } else {
        format!("{prefix}{FRAME_SEPARATOR}{label}")
    }
}

/// Selector identifying `iframe` within its own document.
///
/// Priority: id, name, `src` path, classes, then position among iframes.
pub fn frame_selector(iframe: &ElementHandle<'_>) -> String {
    if let Some(id) = iframe.id().filter(|id| !id.is_empty()) {
        return format!("iframe#{}", escape_ident(id));
    }
    if let Some(name) = iframe.attr("name").filter(|name| !name.is_empty()) {
        return format!("iframe[name={}]", quote_attr_value(name));
    }
    if let Some(path) = iframe.attr("src").and_then(|src| src_path(iframe, src)) {
        return format!("iframe[src*={}]", quote_attr_value(&path));
    }
    let classes = iframe.classes();
    if !classes.is_empty() {
        let joined: String = classes
            .iter()
            .map(|class| format!(".{}", escape_ident(class)))
            .collect();
        return format!("iframe{joined}");
    }
    format!("iframe:nth-of-type({})", iframe.type_index())
}

fn src_path(iframe: &ElementHandle<'_>, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    let parsed = match iframe.document().url() {
        Some(base) => base.join(src).ok(),
        None => Url::parse(src).ok(),
    };
    let path = match parsed {
        Some(url) if url.cannot_be_a_base() => return None,
        Some(url) => url.path().to_string(),
        None => src
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    (!path.is_empty() && path != "/").then_some(path)
}

/// Frame selector chain of `document` relative to the top document.
///
/// `None` for the top document, or when some frame on the way up cannot be
/// entered.
pub fn frame_context_of(document: DocumentRef<'_>) -> Option<String> {
    let mut labels = Vec::new();
    let mut current = document;
    while let Some(parent) = current.parent() {
        let host = parent.iframes().into_iter().find(|iframe| {
            matches!(parent.content_document(iframe), Ok(Some(doc)) if doc == current)
        });
        let Some(host) = host else {
            warn!(document = %document.id(), "no accessible host iframe; frame context unknown");
            return None;
        };
        labels.push(frame_selector(&host));
        current = parent;
    }
    if labels.is_empty() {
        return None;
    }
    labels.reverse();
    Some(labels.join(FRAME_SEPARATOR))
}
