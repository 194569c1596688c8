//! Capture and resolve entry points bound to one policy

use tracing::info;
use waypoint_dom_snapshot::{DocumentRef, ElementHandle};
use waypoint_policy_center::{default_policy, LocatorPolicy};

use crate::context::ContextTreeBuilder;
use crate::errors::LocatorError;
use crate::frames::{enumerate_documents, frame_context_of};
use crate::resolver::{DefaultTargetResolver, TargetResolver};
use crate::strategies::{CandidateGenerator, DefaultCandidateGenerator};
use crate::types::{CaptureOptions, ContextNode, DocumentContext, FinderResult, SelectorSet, Target};

/// Locator facade: generation, capture and resolution under one policy
#[derive(Debug, Clone)]
pub struct Locator {
    policy: LocatorPolicy,
    generator: DefaultCandidateGenerator,
    resolver: DefaultTargetResolver,
}

impl Locator {
    pub fn new(policy: LocatorPolicy) -> Self {
        Self {
            generator: DefaultCandidateGenerator::new(policy.generation.clone()),
            resolver: DefaultTargetResolver::from_policy(&policy),
            policy,
        }
    }

    pub fn policy(&self) -> &LocatorPolicy {
        &self.policy
    }

    /// Candidate selectors for one element
    pub fn generate(&self, element: &ElementHandle<'_>) -> SelectorSet {
        self.generator.generate(element)
    }

    pub fn build_tree(&self, element: &ElementHandle<'_>, iframe_context: Option<&str>) -> Option<ContextNode> {
        ContextTreeBuilder::new(&self.generator).build(element, iframe_context)
    }

    /// Capture `element` as a persistable auto-mode target
    pub fn capture(&self, element: &ElementHandle<'_>, options: &CaptureOptions) -> Result<Target, LocatorError> {
        let iframe_context = frame_context_of(element.document());
        let tree = self
            .build_tree(element, iframe_context.as_deref())
            .ok_or_else(|| LocatorError::Unanchorable(element.to_string()))?;

        info!(
            element = %element,
            selectors = tree.selectors.len(),
            depth = tree.max_depth(),
            frame = iframe_context.as_deref().unwrap_or(""),
            "element captured"
        );

        Ok(Target {
            context_tree: Some(tree),
            text_content: element.text_content().trim().to_string(),
            sequence_index: options.sequence_index,
            precision_level: options.precision_level,
            is_dynamic_content: options.is_dynamic_content,
            iframe_context,
            search_across_frames: options.search_across_frames,
            ..Target::default()
        })
    }

    pub fn resolve<'a>(&self, target: &Target, root: DocumentRef<'a>) -> Option<FinderResult<'a>> {
        self.resolver.resolve(target, root)
    }

    /// Accessible documents under `root`, bounded by the frame policy
    pub fn enumerate_documents<'a>(&self, root: DocumentRef<'a>) -> Vec<DocumentContext<'a>> {
        enumerate_documents(root, self.policy.frames.max_depth)
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(default_policy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchKind, PrecisionLevel, TargetMode};
    use waypoint_dom_snapshot::{DocumentId, Page};

    const PAGE: &str = r#"
        <nav><a href="/">Home</a></nav>
        <div id="app">
          <section class="card">
            <h3>Plan</h3>
            <button class="cta">  Upgrade  </button>
          </section>
        </div>"#;

    #[test]
    fn capture_records_options_and_text() {
        let page = Page::parse(PAGE);
        let locator = Locator::default();
        let button = page.top().query_selector(".cta").unwrap().unwrap();
        let options = CaptureOptions {
            precision_level: PrecisionLevel::Stricter,
            is_dynamic_content: true,
            ..CaptureOptions::default()
        };
        let target = locator.capture(&button, &options).unwrap();
        assert_eq!(target.mode, TargetMode::Auto);
        assert_eq!(target.text_content, "Upgrade");
        assert_eq!(target.precision_level, PrecisionLevel::Stricter);
        assert!(target.is_dynamic_content);
        assert!(target.iframe_context.is_none());
        assert!(target.validate().is_ok());
    }

    #[test]
    fn captured_target_resolves_strictly() {
        let page = Page::parse(PAGE);
        let locator = Locator::default();
        let button = page.top().query_selector(".cta").unwrap().unwrap();
        let target = locator.capture(&button, &CaptureOptions::default()).unwrap();

        let result = locator.resolve(&target, page.top()).unwrap();
        assert_eq!(result.element, button);
        assert_eq!(result.match_kind, MatchKind::Strict);
        assert!(!result.is_in_iframe);
    }

    #[test]
    fn frame_capture_records_context() {
        let mut page = Page::parse("<iframe id='checkout'></iframe>");
        let frame = page
            .attach_frame(DocumentId::TOP, "#checkout", "<form><button id='pay'>Pay</button></form>", None)
            .unwrap();
        let locator = Locator::default();
        let pay = page
            .document(frame)
            .unwrap()
            .query_selector("#pay")
            .unwrap()
            .unwrap();
        let options = CaptureOptions {
            search_across_frames: true,
            ..CaptureOptions::default()
        };
        let target = locator.capture(&pay, &options).unwrap();
        assert_eq!(target.iframe_context.as_deref(), Some("iframe#checkout"));

        let result = locator.resolve(&target, page.top()).unwrap();
        assert_eq!(result.element, pay);
        assert_eq!(result.iframe_context, "iframe#checkout");
        assert!(result.is_in_iframe);
    }
}
