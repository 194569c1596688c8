//! Ancestor chain verification and degraded-match scoring
//!
//! A candidate is checked level by level against the stored context chain,
//! nearest ancestor first. One structural change along the way (a wrapper
//! removed, replaced or inserted) can be absorbed by realigning the two chains;
//! the walk gives up at the next mismatch. The number of stored ancestors that
//! still verified is what the precision rate measures.

use tracing::debug;
use waypoint_dom_snapshot::ElementHandle;
use waypoint_policy_center::PrecisionScale;

use crate::types::{ContextNode, PrecisionLevel, SelectorSet};

/// Outcome of walking one candidate against a stored chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainVerdict {
    /// Depth of the root-most stored node
    pub max_depth: usize,
    /// Stored ancestor levels that matched a live ancestor
    pub verified: usize,
    /// `verified + 1` (at most `max_depth`) when the walk failed; 0 when it did not
    pub failed_depth: usize,
    pub success: bool,
}

impl ChainVerdict {
    /// Precision rate on a 0..=10 scale
    pub fn precision_rate(&self) -> f64 {
        precision_rate(self.failed_depth, self.max_depth)
    }
}

/// `(failed_depth - 1) / max_depth * 10`, or 0 for a leaf-only chain
pub fn precision_rate(failed_depth: usize, max_depth: usize) -> f64 {
    if max_depth == 0 || failed_depth == 0 {
        return 0.0;
    }
    (failed_depth as f64 - 1.0) / max_depth as f64 * 10.0
}

/// Whether a degraded match at `rate` is good enough for `level`
pub fn accept_degraded(rate: f64, level: PrecisionLevel, scale: &PrecisionScale) -> bool {
    rate >= level.threshold(scale)
}

/// Walk `candidate`'s live ancestors in lockstep with the stored chain.
///
/// The walk ends at the document's `<body>`/`<html>` or when the stored chain
/// runs out; running into `<body>` early is not a failure. The first mismatch
/// gets one realignment attempt (see [`realign`]), the second ends the walk.
/// With `compare_siblings`, each level (the leaf included) must also agree
/// with its recorded element siblings.
pub fn verify_chain(tree: &ContextNode, candidate: &ElementHandle<'_>, compare_siblings: bool) -> ChainVerdict {
    let stored: Vec<&ContextNode> = tree.ancestors().collect();
    let max_depth = tree.max_depth();
    let mut success = !compare_siblings || siblings_match(tree, candidate);
    let mut verified = 0;
    let mut realigned = false;
    let mut index = 0;
    let mut live = walkable(candidate.parent_element());

    while let (Some(level), Some(element)) = (stored.get(index).copied(), live) {
        if level_verifies(level, &element, compare_siblings) {
            verified += 1;
            index += 1;
            live = walkable(element.parent_element());
            continue;
        }
        success = false;
        if realigned {
            break;
        }
        realigned = true;
        match realign(&stored[index..], &element, compare_siblings) {
            Some((consumed, next)) => {
                verified += 1;
                index += consumed;
                live = next;
            }
            None => break,
        }
    }

    let verdict = ChainVerdict {
        max_depth,
        verified,
        failed_depth: if success { 0 } else { (verified + 1).min(max_depth) },
        success,
    };
    debug!(
        candidate = %candidate,
        success = verdict.success,
        verified = verdict.verified,
        failed_depth = verdict.failed_depth,
        max_depth = verdict.max_depth,
        compare_siblings,
        "chain verified"
    );
    verdict
}

/// Line the chains up again after `remaining[0]` failed against `element`.
///
/// Tried in order: the stored wrapper was removed (the next stored level
/// matches `element`), replaced (the next stored level matches `element`'s
/// parent) or a new wrapper was inserted (`remaining[0]` matches the parent).
/// Returns the number of stored levels consumed and the next live ancestor.
fn realign<'a>(
    remaining: &[&ContextNode],
    element: &ElementHandle<'a>,
    compare_siblings: bool,
) -> Option<(usize, Option<ElementHandle<'a>>)> {
    let parent = walkable(element.parent_element());
    if let Some(next) = remaining.get(1) {
        if level_verifies(next, element, compare_siblings) {
            return Some((2, parent));
        }
        if let Some(parent) = parent.filter(|parent| level_verifies(next, parent, compare_siblings)) {
            return Some((2, walkable(parent.parent_element())));
        }
    }
    let current = remaining.first()?;
    parent
        .filter(|parent| level_verifies(current, parent, compare_siblings))
        .map(|parent| (1, walkable(parent.parent_element())))
}

fn walkable(element: Option<ElementHandle<'_>>) -> Option<ElementHandle<'_>> {
    element.filter(|el| !el.is_structural_boundary())
}

fn level_verifies(stored: &ContextNode, element: &ElementHandle<'_>, compare_siblings: bool) -> bool {
    level_matches(&stored.selectors, element) && (!compare_siblings || siblings_match(stored, element))
}

/// Recorded siblings still agree with `element`'s live siblings.
///
/// A side is only compared when something was recorded and a live sibling
/// exists.
pub fn siblings_match(stored: &ContextNode, element: &ElementHandle<'_>) -> bool {
    let previous_ok = match element.previous_element_sibling() {
        Some(sibling) if !stored.previous_sibling_selectors.is_empty() => {
            level_matches(&stored.previous_sibling_selectors, &sibling)
        }
        _ => true,
    };
    let next_ok = match element.next_element_sibling() {
        Some(sibling) if !stored.next_sibling_selectors.is_empty() => {
            level_matches(&stored.next_sibling_selectors, &sibling)
        }
        _ => true,
    };
    previous_ok && next_ok
}

/// Some selector of `selectors` selects `element` in its document
fn level_matches(selectors: &SelectorSet, element: &ElementHandle<'_>) -> bool {
    let document = element.document();
    selectors.iter().any(|selector| match document.query_selector_all(selector) {
        Ok(matches) => matches.contains(element),
        Err(err) => {
            debug!(selector = %selector, error = %err, "stored selector no longer parses");
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_dom_snapshot::Page;
    use waypoint_policy_center::default_policy;

    fn node(selectors: &[&str], depth: usize, parent: Option<ContextNode>) -> ContextNode {
        let mut node = ContextNode::leaf(selectors.iter().copied().collect());
        node.depth = depth;
        node.parent = parent.map(Box::new);
        node
    }

    fn chain() -> ContextNode {
        let app = node(&["#app"], 3, None);
        let panel = node(&["section.panel"], 2, Some(app));
        let row = node(&[".row"], 1, Some(panel));
        node(&["button.go"], 0, Some(row))
    }

    fn verdict_for(html: &str) -> ChainVerdict {
        let page = Page::parse(html);
        let go = page.top().query_selector(".go").unwrap().unwrap();
        verify_chain(&chain(), &go, false)
    }

    #[test]
    fn intact_chain_succeeds() {
        let verdict = verdict_for(
            "<div id='app'><section class='panel'><div class='row'><button class='go'>Go</button></div></section></div>",
        );
        assert!(verdict.success);
        assert_eq!(verdict.verified, 3);
        assert_eq!(verdict.failed_depth, 0);
        assert_eq!(verdict.max_depth, 3);
    }

    #[test]
    fn replaced_wrapper_is_realigned() {
        let verdict = verdict_for(
            "<div id='app'><article><div class='row'><button class='go'>Go</button></div></article></div>",
        );
        assert!(!verdict.success);
        assert_eq!(verdict.verified, 2);
        assert_eq!(verdict.failed_depth, 3);
        assert!((verdict.precision_rate() - 20.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn removed_wrapper_is_realigned() {
        let verdict = verdict_for("<div id='app'><section class='panel'><button class='go'>Go</button></section></div>");
        assert!(!verdict.success);
        assert_eq!(verdict.verified, 2);
    }

    #[test]
    fn inserted_wrapper_is_realigned() {
        let verdict = verdict_for(
            "<div id='app'><section class='panel'><div class='row'><span><button class='go'>Go</button></span></div></section></div>",
        );
        assert!(!verdict.success);
        assert_eq!(verdict.verified, 3);
        assert_eq!(verdict.failed_depth, 3, "a failed walk never scores the full chain");
    }

    #[test]
    fn unrelated_ancestry_scores_nothing() {
        let verdict = verdict_for("<nav><ul><li><span><button class='go'>Go</button></span></li></ul></nav>");
        assert!(!verdict.success);
        assert_eq!(verdict.verified, 0);
        assert_eq!(verdict.precision_rate(), 0.0);
    }

    #[test]
    fn second_mismatch_ends_the_walk() {
        // .row replaced, then #app missing above section.panel
        let verdict = verdict_for("<main><section class='panel'><p><button class='go'>Go</button></p></section></main>");
        assert!(!verdict.success);
        assert_eq!(verdict.verified, 1);
        assert_eq!(verdict.failed_depth, 2);
    }

    #[test]
    fn walk_stops_at_body() {
        let verdict = verdict_for("<div class='row'><button class='go'>Go</button></div>");
        assert!(verdict.success, "levels above <body> are not walked");
        assert_eq!(verdict.verified, 1);
    }

    #[test]
    fn sibling_checks_only_compare_recorded_sides() {
        let page = Page::parse("<ul><li class='a'>a</li><li class='b'>b</li><li class='c'>c</li></ul>");
        let b = page.top().query_selector(".b").unwrap().unwrap();
        let mut stored = node(&["li.b"], 0, None);
        assert!(siblings_match(&stored, &b));
        stored.previous_sibling_selectors.insert(".a");
        assert!(siblings_match(&stored, &b));
        stored.next_sibling_selectors.insert(".zzz");
        assert!(!siblings_match(&stored, &b));

        let a = page.top().query_selector(".a").unwrap().unwrap();
        let mut first = node(&["li.a"], 0, None);
        first.previous_sibling_selectors.insert(".missing");
        assert!(siblings_match(&first, &a), "no live previous sibling to compare");
    }

    #[test]
    fn rate_thresholds_follow_precision_scale() {
        let scale = default_policy().precision;
        assert_eq!(precision_rate(3, 4), 5.0);
        assert_eq!(precision_rate(4, 0), 0.0);
        assert_eq!(precision_rate(0, 4), 0.0);
        assert!(accept_degraded(5.0, PrecisionLevel::Medium, &scale));
        assert!(accept_degraded(5.0, PrecisionLevel::Looser, &scale));
        assert!(!accept_degraded(5.0, PrecisionLevel::Stricter, &scale));
        assert!(!accept_degraded(9.9, PrecisionLevel::Strictest, &scale));
    }
}
