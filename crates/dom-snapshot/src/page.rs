//! Page model: top-level document plus attached frame documents

use std::collections::HashMap;
use std::fmt;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::{Origin, Url};

use crate::document::DocumentRef;
use crate::errors::DomError;

/// Nesting bound for automatically loaded `srcdoc` frames
const MAX_SRCDOC_DEPTH: usize = 8;

/// Index of a document inside a [`Page`]; the top document is always `0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub usize);

impl DocumentId {
    pub const TOP: DocumentId = DocumentId(0);

    pub fn is_top(self) -> bool {
        self == Self::TOP
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc-{}", self.0)
    }
}

pub(crate) struct FrameDocument {
    pub(crate) html: Html,
    pub(crate) url: Option<Url>,
    pub(crate) origin: Origin,
    pub(crate) parent: Option<DocumentId>,
    /// iframe ordinal (document order) -> content document
    pub(crate) frames: HashMap<usize, DocumentId>,
}

/// Immutable snapshot of a page and its frame documents
pub struct Page {
    documents: Vec<FrameDocument>,
}

impl Page {
    /// Parse a top-level document with an opaque origin
    pub fn parse(html: &str) -> Self {
        Self::from_top(html, None, Origin::new_opaque())
    }

    /// Parse a top-level document served from `url`
    pub fn parse_with_url(html: &str, url: &str) -> Result<Self, DomError> {
        let url = parse_url(url)?;
        let origin = url.origin();
        Ok(Self::from_top(html, Some(url), origin))
    }

    fn from_top(html: &str, url: Option<Url>, origin: Origin) -> Self {
        let mut page = Self {
            documents: Vec::new(),
        };
        let top = page.push_document(Html::parse_document(html), url, origin, None);
        page.load_srcdoc_frames(top, 0);
        page
    }

    /// Attach `html` as the content document of the first iframe in `parent`
    /// matching `iframe_selector`.
    ///
    /// Without a `url` the frame inherits its parent's origin. `about:` URLs
    /// inherit as well; any other URL contributes its own origin, which is what
    /// later decides whether the frame can be entered.
    pub fn attach_frame(
        &mut self,
        parent: DocumentId,
        iframe_selector: &str,
        html: &str,
        url: Option<&str>,
    ) -> Result<DocumentId, DomError> {
        let parent_doc = self
            .documents
            .get(parent.0)
            .ok_or(DomError::UnknownDocument(parent))?;
        let selector = Selector::parse(iframe_selector)
            .map_err(|err| DomError::invalid_selector(iframe_selector, err))?;
        let target = parent_doc
            .html
            .select(&selector)
            .find(|el| el.value().name() == "iframe")
            .ok_or_else(|| DomError::FrameNotFound(iframe_selector.to_string()))?;
        let ordinal = iframe_elements(&parent_doc.html)
            .iter()
            .position(|candidate| candidate.id() == target.id())
            .ok_or_else(|| DomError::FrameNotFound(iframe_selector.to_string()))?;

        let (frame_url, origin) = match url {
            Some(raw) => {
                let resolved = match parent_doc.url.as_ref() {
                    Some(base) => base
                        .join(raw)
                        .map_err(|err| DomError::InvalidUrl {
                            url: raw.to_string(),
                            reason: err.to_string(),
                        })?,
                    None => parse_url(raw)?,
                };
                let origin = if resolved.scheme() == "about" {
                    parent_doc.origin.clone()
                } else {
                    resolved.origin()
                };
                (Some(resolved), origin)
            }
            None => (None, parent_doc.origin.clone()),
        };

        let child = self.push_document(Html::parse_document(html), frame_url, origin, Some(parent));
        if let Some(previous) = self.documents[parent.0].frames.insert(ordinal, child) {
            debug!(%parent, %previous, %child, "replaced frame document");
        }
        let depth = self.nesting_depth(child);
        self.load_srcdoc_frames(child, depth);
        Ok(child)
    }

    /// Top-level document
    pub fn top(&self) -> DocumentRef<'_> {
        DocumentRef::new(self, DocumentId::TOP)
    }

    pub fn document(&self, id: DocumentId) -> Option<DocumentRef<'_>> {
        (id.0 < self.documents.len()).then(|| DocumentRef::new(self, id))
    }

    /// All documents in load order, regardless of accessibility
    pub fn documents(&self) -> impl Iterator<Item = DocumentRef<'_>> {
        (0..self.documents.len()).map(move |index| DocumentRef::new(self, DocumentId(index)))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub(crate) fn frame_document(&self, id: DocumentId) -> &FrameDocument {
        &self.documents[id.0]
    }

    pub(crate) fn nesting_depth(&self, id: DocumentId) -> usize {
        let mut depth = 0;
        let mut current = self.documents[id.0].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.documents[parent.0].parent;
        }
        depth
    }

    fn push_document(
        &mut self,
        html: Html,
        url: Option<Url>,
        origin: Origin,
        parent: Option<DocumentId>,
    ) -> DocumentId {
        let id = DocumentId(self.documents.len());
        self.documents.push(FrameDocument {
            html,
            url,
            origin,
            parent,
            frames: HashMap::new(),
        });
        id
    }

    fn load_srcdoc_frames(&mut self, doc: DocumentId, depth: usize) {
        let pending: Vec<(usize, String)> = {
            let frame_doc = &self.documents[doc.0];
            iframe_elements(&frame_doc.html)
                .iter()
                .enumerate()
                .filter(|(ordinal, _)| !frame_doc.frames.contains_key(ordinal))
                .filter_map(|(ordinal, el)| {
                    el.value()
                        .attr("srcdoc")
                        .map(|srcdoc| (ordinal, srcdoc.to_string()))
                })
                .collect()
        };
        if pending.is_empty() {
            return;
        }
        if depth >= MAX_SRCDOC_DEPTH {
            warn!(%doc, depth, "srcdoc nesting limit reached; inner frames left unloaded");
            return;
        }

        for (ordinal, srcdoc) in pending {
            let origin = self.documents[doc.0].origin.clone();
            let child = self.push_document(Html::parse_document(&srcdoc), None, origin, Some(doc));
            self.documents[doc.0].frames.insert(ordinal, child);
            debug!(parent = %doc, %child, ordinal, "loaded srcdoc frame");
            self.load_srcdoc_frames(child, depth + 1);
        }
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("documents", &self.documents.len())
            .finish()
    }
}

/// iframes of a document in document order
pub(crate) fn iframe_elements(html: &Html) -> Vec<ElementRef<'_>> {
    html.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "iframe")
        .collect()
}

fn parse_url(raw: &str) -> Result<Url, DomError> {
    Url::parse(raw).map_err(|err| DomError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })
}
