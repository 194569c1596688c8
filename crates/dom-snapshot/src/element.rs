//! Element handles bound to a document

use std::fmt;

use scraper::ElementRef;
use serde::{Deserialize, Serialize};

use crate::document::DocumentRef;
use crate::page::DocumentId;

const SUMMARY_TEXT_LIMIT: usize = 80;

/// Live reference to an element of a page snapshot.
///
/// Equality is identity: two handles are equal when they point at the same
/// node of the same document.
#[derive(Clone, Copy)]
pub struct ElementHandle<'a> {
    document: DocumentRef<'a>,
    element: ElementRef<'a>,
}

impl<'a> ElementHandle<'a> {
    pub(crate) fn new(document: DocumentRef<'a>, element: ElementRef<'a>) -> Self {
        Self { document, element }
    }

    pub fn document(&self) -> DocumentRef<'a> {
        self.document
    }

    /// Lower-case local name
    pub fn tag_name(&self) -> &'a str {
        self.element.value().name()
    }

    pub fn id(&self) -> Option<&'a str> {
        self.element.value().id()
    }

    /// Distinct class names in attribute order
    pub fn classes(&self) -> Vec<&'a str> {
        let mut classes: Vec<&'a str> = Vec::new();
        for class in self.element.value().classes() {
            if !classes.contains(&class) {
                classes.push(class);
            }
        }
        classes
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    pub fn attributes(&self) -> Vec<(&'a str, &'a str)> {
        self.element.value().attrs().collect()
    }

    pub fn parent_element(&self) -> Option<ElementHandle<'a>> {
        self.element
            .parent()
            .and_then(ElementRef::wrap)
            .map(|el| Self::new(self.document, el))
    }

    pub fn previous_element_sibling(&self) -> Option<ElementHandle<'a>> {
        self.element
            .prev_siblings()
            .find_map(ElementRef::wrap)
            .map(|el| Self::new(self.document, el))
    }

    pub fn next_element_sibling(&self) -> Option<ElementHandle<'a>> {
        self.element
            .next_siblings()
            .find_map(ElementRef::wrap)
            .map(|el| Self::new(self.document, el))
    }

    /// 1-based position among element siblings (`:nth-child`)
    pub fn child_index(&self) -> usize {
        1 + self
            .element
            .prev_siblings()
            .filter(|node| node.value().is_element())
            .count()
    }

    /// 1-based position among same-tag siblings (`:nth-of-type`)
    pub fn type_index(&self) -> usize {
        let tag = self.tag_name();
        1 + self
            .element
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == tag)
            .count()
    }

    /// Concatenated descendant text, untrimmed
    pub fn text_content(&self) -> String {
        self.element.text().collect()
    }

    /// `<html>` or `<body>`: the outermost structure of a document
    pub fn is_structural_boundary(&self) -> bool {
        matches!(self.tag_name(), "html" | "body")
    }

    /// Position of this element in document order
    pub fn document_index(&self) -> usize {
        self.document
            .elements()
            .iter()
            .position(|el| el == self)
            .unwrap_or_default()
    }

    pub fn describe(&self) -> ElementSummary {
        let text = self.text_content();
        let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let text = if trimmed.chars().count() > SUMMARY_TEXT_LIMIT {
            let mut cut: String = trimmed.chars().take(SUMMARY_TEXT_LIMIT).collect();
            cut.push('…');
            cut
        } else {
            trimmed
        };
        ElementSummary {
            document: self.document.id(),
            tag: self.tag_name().to_string(),
            id: self.id().map(str::to_string),
            classes: self.classes().into_iter().map(str::to_string).collect(),
            text,
            index: self.document_index(),
        }
    }
}

impl PartialEq for ElementHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document && self.element.id() == other.element.id()
    }
}

impl Eq for ElementHandle<'_> {}

impl fmt::Display for ElementHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag_name())?;
        if let Some(id) = self.id() {
            write!(f, "#{id}")?;
        }
        for class in self.classes() {
            write!(f, ".{class}")?;
        }
        write!(f, ">")
    }
}

impl fmt::Debug for ElementHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self, self.document.id())
    }
}

/// Serializable description of a located element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSummary {
    pub document: DocumentId,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub text: String,
    /// Position in document order
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use crate::page::Page;

    const LIST: &str = r#"
        <ul id="menu">
          <li class="item first">Home</li>
          <span>divider</span>
          <li class="item">About</li>
        </ul>"#;

    #[test]
    fn sibling_navigation_skips_text_nodes() {
        let page = Page::parse(LIST);
        let about = page.top().query_selector_all("li").unwrap()[1];
        let prev = about.previous_element_sibling().unwrap();
        assert_eq!(prev.tag_name(), "span");
        assert!(about.next_element_sibling().is_none());
    }

    #[test]
    fn positional_indices() {
        let page = Page::parse(LIST);
        let about = page.top().query_selector_all("li").unwrap()[1];
        assert_eq!(about.child_index(), 3);
        assert_eq!(about.type_index(), 2);
    }

    #[test]
    fn parent_chain_reaches_boundary() {
        let page = Page::parse(LIST);
        let menu = page.top().query_selector("#menu").unwrap().unwrap();
        let body = menu.parent_element().unwrap();
        assert!(body.is_structural_boundary());
        assert_eq!(body.parent_element().unwrap().tag_name(), "html");
    }

    #[test]
    fn handles_compare_by_identity() {
        let page = Page::parse(LIST);
        let top = page.top();
        let by_class = top.query_selector(".first").unwrap().unwrap();
        let by_tag = top.query_selector("li").unwrap().unwrap();
        let second = top.query_selector_all("li").unwrap()[1];
        assert_eq!(by_class, by_tag);
        assert_ne!(by_class, second);
    }

    #[test]
    fn summary_collapses_whitespace() {
        let page = Page::parse("<p class='x y'>  Save\n   changes </p>");
        let summary = page.top().query_selector("p").unwrap().unwrap().describe();
        assert_eq!(summary.text, "Save changes");
        assert_eq!(summary.classes, vec!["x", "y"]);
        assert_eq!(summary.tag, "p");
    }
}
