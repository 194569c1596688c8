//! Core types for locator system

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use waypoint_dom_snapshot::{DocumentRef, ElementHandle, ElementSummary};
use waypoint_policy_center::PrecisionScale;

use crate::errors::LocatorError;

/// Ordered, de-duplicated selector strings describing one element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SelectorSet(Vec<String>);

impl SelectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a selector; blank and repeated selectors are ignored
    pub fn insert(&mut self, selector: impl Into<String>) -> bool {
        let selector = selector.into();
        if selector.trim().is_empty() || self.0.contains(&selector) {
            return false;
        }
        self.0.push(selector);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.0.iter().any(|s| s == selector)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for SelectorSet {
    fn from(selectors: Vec<String>) -> Self {
        selectors.into_iter().collect()
    }
}

impl From<SelectorSet> for Vec<String> {
    fn from(set: SelectorSet) -> Self {
        set.0
    }
}

impl FromIterator<String> for SelectorSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = SelectorSet::new();
        for selector in iter {
            set.insert(selector);
        }
        set
    }
}

impl<'s> FromIterator<&'s str> for SelectorSet {
    fn from_iter<I: IntoIterator<Item = &'s str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

impl<'s> IntoIterator for &'s SelectorSet {
    type Item = &'s String;
    type IntoIter = std::slice::Iter<'s, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One ancestor level of a captured element.
///
/// `depth` is 0 at the captured element and grows by one per ancestor; each
/// node exclusively owns its parent, so the chain always ends in `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextNode {
    pub selectors: SelectorSet,
    #[serde(default)]
    pub previous_sibling_selectors: SelectorSet,
    #[serde(default)]
    pub next_sibling_selectors: SelectorSet,
    pub depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<ContextNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe_context: Option<String>,
    #[serde(default)]
    pub is_in_iframe: bool,
}

impl ContextNode {
    /// Leaf-only node with no recorded siblings or ancestors
    pub fn leaf(selectors: SelectorSet) -> Self {
        Self {
            selectors,
            previous_sibling_selectors: SelectorSet::new(),
            next_sibling_selectors: SelectorSet::new(),
            depth: 0,
            parent: None,
            iframe_context: None,
            is_in_iframe: false,
        }
    }

    /// Stored ancestors, nearest first
    pub fn ancestors(&self) -> impl Iterator<Item = &ContextNode> {
        std::iter::successors(self.parent.as_deref(), |node| node.parent.as_deref())
    }

    /// Depth of the root-most stored node
    pub fn max_depth(&self) -> usize {
        self.ancestors().last().map_or(self.depth, |node| node.depth)
    }

    pub fn has_sibling_selectors(&self) -> bool {
        !self.previous_sibling_selectors.is_empty() || !self.next_sibling_selectors.is_empty()
    }
}

/// How strict a degraded match must be, loosest first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecisionLevel {
    Looser,
    Loose,
    #[default]
    Medium,
    Stricter,
    Strictest,
}

impl PrecisionLevel {
    pub fn name(&self) -> &'static str {
        match self {
            PrecisionLevel::Looser => "looser",
            PrecisionLevel::Loose => "loose",
            PrecisionLevel::Medium => "medium",
            PrecisionLevel::Stricter => "stricter",
            PrecisionLevel::Strictest => "strictest",
        }
    }

    /// Minimum precision rate (0..=10) this level accepts
    pub fn threshold(&self, scale: &PrecisionScale) -> f64 {
        match self {
            PrecisionLevel::Looser => scale.looser,
            PrecisionLevel::Loose => scale.loose,
            PrecisionLevel::Medium => scale.medium,
            PrecisionLevel::Stricter => scale.stricter,
            PrecisionLevel::Strictest => scale.strictest,
        }
    }
}

impl fmt::Display for PrecisionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrecisionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "looser" => Ok(PrecisionLevel::Looser),
            "loose" => Ok(PrecisionLevel::Loose),
            "medium" => Ok(PrecisionLevel::Medium),
            "stricter" => Ok(PrecisionLevel::Stricter),
            "strictest" => Ok(PrecisionLevel::Strictest),
            other => Err(format!(
                "unknown precision level '{other}' (expected looser, loose, medium, stricter or strictest)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    #[default]
    Auto,
    Custom,
}

/// Persisted descriptor of a captured element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(default)]
    pub context_tree: Option<ContextNode>,
    #[serde(default)]
    pub text_content: String,
    #[serde(default)]
    pub sequence_index: usize,
    #[serde(default)]
    pub precision_level: PrecisionLevel,
    #[serde(default)]
    pub is_dynamic_content: bool,
    #[serde(default)]
    pub custom_selector: String,
    #[serde(default)]
    pub mode: TargetMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe_context: Option<String>,
    #[serde(default)]
    pub search_across_frames: bool,
}

impl Target {
    /// Auto-mode target over a captured context tree
    pub fn auto(tree: ContextNode) -> Self {
        Self {
            iframe_context: tree.iframe_context.clone(),
            context_tree: Some(tree),
            ..Self::default()
        }
    }

    /// Custom-mode target over a literal selector
    pub fn custom(selector: impl Into<String>, sequence_index: usize) -> Self {
        Self {
            custom_selector: selector.into(),
            sequence_index,
            mode: TargetMode::Custom,
            ..Self::default()
        }
    }

    pub fn with_precision(mut self, level: PrecisionLevel) -> Self {
        self.precision_level = level;
        self
    }

    pub fn with_dynamic_text(mut self, text: impl Into<String>) -> Self {
        self.is_dynamic_content = true;
        self.text_content = text.into();
        self
    }

    pub fn across_frames(mut self, enabled: bool) -> Self {
        self.search_across_frames = enabled;
        self
    }

    pub fn is_custom(&self) -> bool {
        self.mode == TargetMode::Custom
    }

    /// Text a located element must carry, if the target asks for it
    pub fn expected_text(&self) -> Option<&str> {
        let text = self.text_content.trim();
        (self.is_dynamic_content && !text.is_empty()).then_some(text)
    }

    /// Check the target can be resolved at all
    pub fn validate(&self) -> Result<(), LocatorError> {
        match self.mode {
            TargetMode::Auto => match &self.context_tree {
                None => Err(LocatorError::InvalidTarget(
                    "auto mode requires a context tree".into(),
                )),
                Some(tree) if tree.selectors.is_empty() => Err(LocatorError::InvalidTarget(
                    "context tree leaf has no selectors".into(),
                )),
                Some(_) => Ok(()),
            },
            TargetMode::Custom if self.custom_selector.trim().is_empty() => Err(
                LocatorError::InvalidTarget("custom mode requires a selector".into()),
            ),
            TargetMode::Custom => Ok(()),
        }
    }
}

/// Caller choices recorded into a captured target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureOptions {
    pub precision_level: PrecisionLevel,
    pub is_dynamic_content: bool,
    pub search_across_frames: bool,
    pub sequence_index: usize,
}

/// One accessible document: the root or a same-origin frame
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentContext<'a> {
    pub document: DocumentRef<'a>,
    /// Empty for the document resolution started from
    pub frame_selector: String,
    /// Frame nesting level relative to that document
    pub depth: usize,
}

impl<'a> DocumentContext<'a> {
    pub fn root(document: DocumentRef<'a>) -> Self {
        Self {
            document,
            frame_selector: String::new(),
            depth: 0,
        }
    }

    pub fn is_in_iframe(&self) -> bool {
        !self.document.is_top()
    }
}

/// How a result was accepted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MatchKind {
    /// Every stored ancestor level verified
    Strict,
    /// Ancestor verification failed but the precision rate met the level
    Degraded { rate: f64 },
    /// Literal custom selector
    Custom,
}

impl MatchKind {
    pub fn is_degraded(&self) -> bool {
        matches!(self, MatchKind::Degraded { .. })
    }
}

/// Live element located for a target; never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct FinderResult<'a> {
    pub element: ElementHandle<'a>,
    pub iframe_context: String,
    pub is_in_iframe: bool,
    pub match_kind: MatchKind,
}

impl FinderResult<'_> {
    pub fn report(&self) -> FinderReport {
        FinderReport {
            element: self.element.describe(),
            iframe_context: self.iframe_context.clone(),
            is_in_iframe: self.is_in_iframe,
            match_kind: self.match_kind,
        }
    }
}

/// Serializable view of a [`FinderResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinderReport {
    pub element: ElementSummary,
    pub iframe_context: String,
    pub is_in_iframe: bool,
    pub match_kind: MatchKind,
}
