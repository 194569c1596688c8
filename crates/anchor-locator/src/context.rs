//! Ancestor/sibling context capture

use tracing::debug;
use waypoint_dom_snapshot::ElementHandle;

use crate::strategies::CandidateGenerator;
use crate::types::{ContextNode, SelectorSet};

/// Builds the [`ContextNode`] chain for an element
pub struct ContextTreeBuilder<'g> {
    generator: &'g dyn CandidateGenerator,
}

impl<'g> ContextTreeBuilder<'g> {
    pub fn new(generator: &'g dyn CandidateGenerator) -> Self {
        Self { generator }
    }

    /// Capture `element` and its ancestors up to the document's `<body>`.
    ///
    /// Returns `None` when the element itself yields no selectors. An ancestor
    /// that yields none ends the chain at the node below it.
    pub fn build(&self, element: &ElementHandle<'_>, iframe_context: Option<&str>) -> Option<ContextNode> {
        self.build_level(element, 0, iframe_context)
    }

    fn build_level(
        &self,
        element: &ElementHandle<'_>,
        depth: usize,
        iframe_context: Option<&str>,
    ) -> Option<ContextNode> {
        let selectors = self.generator.generate(element);
        if selectors.is_empty() {
            debug!(element = %element, depth, "no selectors; context chain ends here");
            return None;
        }

        let parent = element
            .parent_element()
            .filter(|parent| !parent.is_structural_boundary())
            .and_then(|parent| self.build_level(&parent, depth + 1, iframe_context))
            .map(Box::new);

        Some(ContextNode {
            selectors,
            previous_sibling_selectors: self.sibling_selectors(element.previous_element_sibling()),
            next_sibling_selectors: self.sibling_selectors(element.next_element_sibling()),
            depth,
            parent,
            iframe_context: iframe_context.map(str::to_string),
            is_in_iframe: !element.document().is_top(),
        })
    }

    fn sibling_selectors(&self, sibling: Option<ElementHandle<'_>>) -> SelectorSet {
        sibling
            .map(|sibling| self.generator.generate(&sibling))
            .unwrap_or_default()
    }
}
