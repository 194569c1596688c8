//! Target resolution against a live page
//!
//! Resolution walks the accessible documents in enumeration order and stops
//! at the first one that yields an element:
//! 1. Query every leaf selector and pick candidates (most recurring first)
//! 2. Verify each candidate's ancestor chain
//! 3. Break ties between strict successes with sibling checks
//! 4. Otherwise accept the best partial match if its precision rate allows
//! 5. Apply the optional text constraint

use tracing::{debug, info, warn};
use waypoint_dom_snapshot::{DocumentRef, ElementHandle};
use waypoint_policy_center::{LocatorPolicy, PrecisionScale};

use crate::errors::LocatorError;
use crate::frames::enumerate_documents;
use crate::healer::{accept_degraded, verify_chain, ChainVerdict};
use crate::types::{ContextNode, DocumentContext, FinderResult, MatchKind, Target, TargetMode};

/// Resolves persisted targets to live elements
pub trait TargetResolver {
    /// Resolve `target` starting from `root`; `None` when nothing qualifies
    fn resolve<'a>(&self, target: &Target, root: DocumentRef<'a>) -> Option<FinderResult<'a>>;

    /// Resolve `target` inside a single document
    fn resolve_in<'a>(
        &self,
        target: &Target,
        context: &DocumentContext<'a>,
    ) -> Result<Option<FinderResult<'a>>, LocatorError>;
}

/// Default resolver implementation
#[derive(Debug, Clone)]
pub struct DefaultTargetResolver {
    precision: PrecisionScale,
    max_frame_depth: usize,
}

impl DefaultTargetResolver {
    pub fn new(precision: PrecisionScale, max_frame_depth: usize) -> Self {
        Self {
            precision,
            max_frame_depth,
        }
    }

    pub fn from_policy(policy: &LocatorPolicy) -> Self {
        Self::new(policy.precision.clone(), policy.frames.max_depth)
    }

    fn resolve_custom<'a>(
        &self,
        target: &Target,
        context: &DocumentContext<'a>,
    ) -> Result<Option<FinderResult<'a>>, LocatorError> {
        let matches = context.document.query_selector_all(&target.custom_selector)?;
        let Some(element) = matches
            .get(target.sequence_index)
            .or_else(|| matches.first())
            .copied()
        else {
            return Ok(None);
        };
        Ok(finish(target, context, element, MatchKind::Custom))
    }

    fn resolve_auto<'a>(
        &self,
        target: &Target,
        tree: &ContextNode,
        context: &DocumentContext<'a>,
    ) -> Result<Option<FinderResult<'a>>, LocatorError> {
        let candidates = leaf_candidates(tree, context);
        if candidates.is_empty() {
            return Ok(None);
        }

        let verdicts: Vec<(ElementHandle<'a>, ChainVerdict)> = candidates
            .into_iter()
            .map(|candidate| (candidate, verify_chain(tree, &candidate, false)))
            .collect();
        let strict: Vec<ElementHandle<'a>> = verdicts
            .iter()
            .filter(|(_, verdict)| verdict.success)
            .map(|(candidate, _)| *candidate)
            .collect();

        let (element, kind) = match strict.as_slice() {
            [only] => (*only, MatchKind::Strict),
            [] => {
                let Some((best, verdict)) = best_partial(verdicts) else {
                    return Ok(None);
                };
                let rate = verdict.precision_rate();
                if !accept_degraded(rate, target.precision_level, &self.precision) {
                    debug!(
                        candidate = %best,
                        rate,
                        level = %target.precision_level,
                        "degraded match below precision threshold"
                    );
                    return Ok(None);
                }
                (best, MatchKind::Degraded { rate })
            }
            several => {
                debug!(count = several.len(), "several strict matches; checking siblings");
                let with_siblings: Vec<(ElementHandle<'a>, ChainVerdict)> = several
                    .iter()
                    .map(|candidate| (*candidate, verify_chain(tree, candidate, true)))
                    .collect();
                let winner = with_siblings
                    .iter()
                    .find(|(_, verdict)| verdict.success)
                    .map(|(candidate, _)| *candidate)
                    .or_else(|| best_partial(with_siblings.clone()).map(|(candidate, _)| candidate));
                match winner {
                    Some(winner) => (winner, MatchKind::Strict),
                    None => return Ok(None),
                }
            }
        };

        Ok(finish(target, context, element, kind))
    }
}

impl Default for DefaultTargetResolver {
    fn default() -> Self {
        Self::from_policy(&waypoint_policy_center::default_policy())
    }
}

impl TargetResolver for DefaultTargetResolver {
    fn resolve<'a>(&self, target: &Target, root: DocumentRef<'a>) -> Option<FinderResult<'a>> {
        if let Err(err) = target.validate() {
            warn!(error = %err, "target rejected");
            return None;
        }

        let contexts = if target.search_across_frames {
            enumerate_documents(root, self.max_frame_depth)
        } else {
            vec![DocumentContext::root(root)]
        };

        for context in &contexts {
            match self.resolve_in(target, context) {
                Ok(Some(result)) => {
                    info!(
                        element = %result.element,
                        frame = %context.frame_selector,
                        kind = ?result.match_kind,
                        "target resolved"
                    );
                    return Some(result);
                }
                Ok(None) => {
                    debug!(document = %context.document.id(), frame = %context.frame_selector, "no match in document");
                }
                Err(err) => {
                    debug!(document = %context.document.id(), error = %err, "document skipped");
                }
            }
        }

        info!(documents = contexts.len(), "target not found");
        None
    }

    fn resolve_in<'a>(
        &self,
        target: &Target,
        context: &DocumentContext<'a>,
    ) -> Result<Option<FinderResult<'a>>, LocatorError> {
        match (target.mode, &target.context_tree) {
            (TargetMode::Custom, _) => self.resolve_custom(target, context),
            (TargetMode::Auto, Some(tree)) => self.resolve_auto(target, tree, context),
            (TargetMode::Auto, None) => Err(LocatorError::InvalidTarget(
                "auto mode requires a context tree".into(),
            )),
        }
    }
}

/// Elements matched by the leaf selectors.
///
/// When some element is returned by more than one selector, only the most
/// recurring elements remain; otherwise every distinct match is a candidate.
fn leaf_candidates<'a>(tree: &ContextNode, context: &DocumentContext<'a>) -> Vec<ElementHandle<'a>> {
    let mut hits: Vec<(ElementHandle<'a>, usize)> = Vec::new();
    for selector in &tree.selectors {
        let matches = match context.document.query_selector_all(selector) {
            Ok(matches) => matches,
            Err(err) => {
                debug!(selector = %selector, error = %err, "leaf selector skipped");
                continue;
            }
        };
        for element in matches {
            match hits.iter_mut().find(|(seen, _)| *seen == element) {
                Some((_, count)) => *count += 1,
                None => hits.push((element, 1)),
            }
        }
    }

    let most = hits.iter().map(|(_, count)| *count).max().unwrap_or_default();
    hits.into_iter()
        .filter(|(_, count)| most <= 1 || *count == most)
        .map(|(element, _)| element)
        .collect()
}

/// Candidate whose chain verified furthest before failing; the earliest wins ties
fn best_partial<'a>(
    verdicts: Vec<(ElementHandle<'a>, ChainVerdict)>,
) -> Option<(ElementHandle<'a>, ChainVerdict)> {
    verdicts.into_iter().reduce(|best, next| {
        if next.1.verified > best.1.verified {
            next
        } else {
            best
        }
    })
}

fn finish<'a>(
    target: &Target,
    context: &DocumentContext<'a>,
    element: ElementHandle<'a>,
    match_kind: MatchKind,
) -> Option<FinderResult<'a>> {
    if let Some(expected) = target.expected_text() {
        let actual = element.text_content();
        if actual.trim() != expected {
            debug!(element = %element, expected, actual = actual.trim(), "text content changed");
            return None;
        }
    }
    Some(FinderResult {
        element,
        iframe_context: context.frame_selector.clone(),
        is_in_iframe: context.is_in_iframe(),
        match_kind,
    })
}
