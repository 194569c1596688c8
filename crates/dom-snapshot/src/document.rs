//! Borrowed view over one document of a page

use std::fmt;

use scraper::{ElementRef, Selector};
use tracing::debug;
use url::{Origin, Url};

use crate::element::ElementHandle;
use crate::errors::{DomError, FrameAccessError};
use crate::page::{iframe_elements, DocumentId, FrameDocument, Page};

/// Cheap, copyable reference to a document inside a [`Page`]
#[derive(Clone, Copy)]
pub struct DocumentRef<'a> {
    page: &'a Page,
    id: DocumentId,
}

impl<'a> DocumentRef<'a> {
    pub(crate) fn new(page: &'a Page, id: DocumentId) -> Self {
        Self { page, id }
    }

    fn inner(&self) -> &'a FrameDocument {
        self.page.frame_document(self.id)
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn page(&self) -> &'a Page {
        self.page
    }

    pub fn is_top(&self) -> bool {
        self.id.is_top()
    }

    pub fn url(&self) -> Option<&'a Url> {
        self.inner().url.as_ref()
    }

    pub fn origin(&self) -> &'a Origin {
        &self.inner().origin
    }

    /// Document hosting the iframe this document was loaded into
    pub fn parent(&self) -> Option<DocumentRef<'a>> {
        self.inner().parent.map(|id| DocumentRef::new(self.page, id))
    }

    /// Frame nesting level; `0` for the top document
    pub fn nesting_depth(&self) -> usize {
        self.page.nesting_depth(self.id)
    }

    /// The `<html>` element
    pub fn root_element(&self) -> ElementHandle<'a> {
        ElementHandle::new(*self, self.inner().html.root_element())
    }

    pub fn body(&self) -> Option<ElementHandle<'a>> {
        self.inner()
            .html
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "body")
            .map(|el| ElementHandle::new(*self, el))
    }

    /// All elements matching `css`, in document order
    pub fn query_selector_all(&self, css: &str) -> Result<Vec<ElementHandle<'a>>, DomError> {
        let selector = Selector::parse(css).map_err(|err| DomError::invalid_selector(css, err))?;
        Ok(self
            .inner()
            .html
            .select(&selector)
            .map(|el| ElementHandle::new(*self, el))
            .collect())
    }

    pub fn query_selector(&self, css: &str) -> Result<Option<ElementHandle<'a>>, DomError> {
        let selector = Selector::parse(css).map_err(|err| DomError::invalid_selector(css, err))?;
        Ok(self
            .inner()
            .html
            .select(&selector)
            .next()
            .map(|el| ElementHandle::new(*self, el)))
    }

    /// Number of elements matching `css`
    pub fn count(&self, css: &str) -> Result<usize, DomError> {
        let selector = Selector::parse(css).map_err(|err| DomError::invalid_selector(css, err))?;
        Ok(self.inner().html.select(&selector).count())
    }

    /// Every element of the document in document order
    pub fn elements(&self) -> Vec<ElementHandle<'a>> {
        self.inner()
            .html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .map(|el| ElementHandle::new(*self, el))
            .collect()
    }

    /// iframes of this document in document order
    pub fn iframes(&self) -> Vec<ElementHandle<'a>> {
        iframe_elements(&self.inner().html)
            .into_iter()
            .map(|el| ElementHandle::new(*self, el))
            .collect()
    }

    /// Content document of `iframe`.
    ///
    /// `Ok(None)` means the iframe has no loaded document. Frames whose origin
    /// differs from the top document's are refused with
    /// [`FrameAccessError::Denied`].
    pub fn content_document(
        &self,
        iframe: &ElementHandle<'a>,
    ) -> Result<Option<DocumentRef<'a>>, FrameAccessError> {
        if iframe.tag_name() != "iframe" || iframe.document() != *self {
            return Err(FrameAccessError::NotAnIframe(iframe.tag_name().to_string()));
        }
        let Some(ordinal) = self.iframes().iter().position(|frame| frame == iframe) else {
            return Err(FrameAccessError::NotAnIframe(iframe.tag_name().to_string()));
        };
        let Some(&child) = self.inner().frames.get(&ordinal) else {
            debug!(document = %self.id, ordinal, "iframe has no content document");
            return Ok(None);
        };

        let child = DocumentRef::new(self.page, child);
        if child.origin() != self.page.top().origin() {
            return Err(FrameAccessError::Denied {
                frame: iframe.to_string(),
                origin: child.origin().ascii_serialization(),
            });
        }
        Ok(Some(child))
    }
}

impl PartialEq for DocumentRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.page, other.page) && self.id == other.id
    }
}

impl Eq for DocumentRef<'_> {}

impl fmt::Debug for DocumentRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRef")
            .field("id", &self.id)
            .field("url", &self.url().map(Url::as_str))
            .finish()
    }
}
