//! Minimal unique selector search
//!
//! Builds selectors bottom-up from the element toward the document root.
//! Every level contributes a family of "knots" (id, allow-listed attribute,
//! class, tag or `*`), each with a penalty. Combinations of one knot per level
//! are tried cheapest first until one matches exactly the element; the winner
//! is then shortened by dropping intermediate levels.

use std::collections::HashSet;

use tracing::debug;
use waypoint_dom_snapshot::css::{escape_ident, quote_attr_value};
use waypoint_dom_snapshot::ElementHandle;

use crate::errors::LocatorError;

const ID_PENALTY: f64 = 0.0;
const ATTRIBUTE_PENALTY: f64 = 0.5;
const CLASS_PENALTY: f64 = 1.0;
const ANY_PENALTY: f64 = 3.0;
const TAG_PENALTY: f64 = 5.0;
const NTH_PENALTY: f64 = 1.0;

/// Which class names a search may use
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClassFilter {
    #[default]
    None,
    All,
    /// Only this class, wherever it appears in the chain
    Only(String),
}

impl ClassFilter {
    fn admits(&self, class: &str) -> bool {
        match self {
            ClassFilter::None => false,
            ClassFilter::All => true,
            ClassFilter::Only(name) => name == class,
        }
    }
}

/// Knobs for one selector search
#[derive(Debug, Clone, PartialEq)]
pub struct FinderOptions {
    pub id_name: bool,
    pub class_name: ClassFilter,
    pub tag_name: bool,
    /// Attribute names that may appear as `[name="value"]`
    pub attributes: Vec<String>,
    pub seed_min_length: usize,
    pub optimized_min_length: usize,
    pub threshold: usize,
    pub max_number_of_tries: usize,
}

impl Default for FinderOptions {
    fn default() -> Self {
        Self {
            id_name: true,
            class_name: ClassFilter::All,
            tag_name: true,
            attributes: Vec::new(),
            seed_min_length: 1,
            optimized_min_length: 2,
            threshold: 1000,
            max_number_of_tries: 10_000,
        }
    }
}

/// One selector fragment for a single level of the chain
#[derive(Debug, Clone, PartialEq)]
pub struct Knot {
    pub name: String,
    pub penalty: f64,
    /// Distance from the element; 0 is the element itself
    pub level: usize,
}

/// How many positional knots a level may add
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    All,
    Two,
    One,
    None,
}

impl Limit {
    fn next(self) -> Option<Limit> {
        match self {
            Limit::All => Some(Limit::Two),
            Limit::Two => Some(Limit::One),
            Limit::One => Some(Limit::None),
            Limit::None => None,
        }
    }
}

type Path = Vec<Knot>;

enum Uniqueness {
    Found(Path),
    Missing,
    TooMany,
}

/// Find a selector that matches `element` and nothing else in its document
pub fn find_selector(element: &ElementHandle<'_>, options: &FinderOptions) -> Result<String, LocatorError> {
    let search = Search { element: *element, options };
    let path = search
        .bottom_up(Limit::All)
        .ok_or_else(|| LocatorError::SelectorNotFound(element.to_string()))?;

    let mut tries = 0;
    let mut visited = HashSet::new();
    let mut optimized = Vec::new();
    search.optimize(&path, &mut tries, &mut visited, &mut optimized);
    let best = optimized
        .into_iter()
        .min_by(|a, b| {
            penalty(a)
                .total_cmp(&penalty(b))
                .then_with(|| a.len().cmp(&b.len()))
        })
        .filter(|candidate| penalty(candidate) <= penalty(&path))
        .unwrap_or(path);
    Ok(selector_of(&best))
}

struct Search<'s, 'a> {
    element: ElementHandle<'a>,
    options: &'s FinderOptions,
}

impl Search<'_, '_> {
    fn bottom_up(&self, limit: Limit) -> Option<Path> {
        let mut fallback: Option<Option<Path>> = None;
        let mut stack: Vec<Vec<Knot>> = Vec::new();
        let mut current = Some(self.element);
        let mut level = 0;

        while let Some(node) = current {
            if node.tag_name() == "html" && level > 0 {
                break;
            }
            stack.push(self.level_knots(&node, level, limit));
            if stack.len() >= self.options.seed_min_length {
                match self.unique_path(&stack) {
                    Uniqueness::Found(path) => return Some(path),
                    Uniqueness::TooMany => {
                        if let Some(path) = self.fallback(limit, &mut fallback) {
                            return Some(path);
                        }
                    }
                    Uniqueness::Missing => {}
                }
            }
            current = node.parent_element();
            level += 1;
        }

        match self.unique_path(&stack) {
            Uniqueness::Found(path) => Some(path),
            Uniqueness::TooMany | Uniqueness::Missing => self.fallback(limit, &mut fallback),
        }
    }

    fn fallback(&self, limit: Limit, cache: &mut Option<Option<Path>>) -> Option<Path> {
        cache
            .get_or_insert_with(|| {
                limit.next().and_then(|next| {
                    debug!(?limit, ?next, element = %self.element, "selector search falling back");
                    self.bottom_up(next)
                })
            })
            .clone()
    }

    fn level_knots(&self, node: &ElementHandle<'_>, level: usize, limit: Limit) -> Vec<Knot> {
        let mut knots = self.id_knot(node);
        if knots.is_empty() {
            knots = self.attribute_knots(node);
        }
        if knots.is_empty() {
            knots = self.class_knots(node);
        }
        if knots.is_empty() && self.options.tag_name {
            knots.push(knot(node.tag_name().to_string(), TAG_PENALTY));
        }
        if knots.is_empty() {
            knots.push(knot("*".to_string(), ANY_PENALTY));
        }

        let nth = (node.tag_name() != "html").then(|| node.child_index());
        let positional = |base: &Knot| Knot {
            name: format!("{}:nth-child({})", base.name, nth.unwrap_or(1)),
            penalty: base.penalty + NTH_PENALTY,
            level: 0,
        };
        match limit {
            Limit::All => {
                if nth.is_some() {
                    let extra: Vec<Knot> = knots.iter().filter(|k| dispensable(k)).map(positional).collect();
                    knots.extend(extra);
                }
            }
            Limit::Two => {
                knots.truncate(1);
                if nth.is_some() {
                    let extra: Vec<Knot> = knots.iter().filter(|k| dispensable(k)).map(positional).collect();
                    knots.extend(extra);
                }
            }
            Limit::One | Limit::None => {
                if limit == Limit::None {
                    knots = vec![knot("*".to_string(), ANY_PENALTY)];
                } else {
                    knots.truncate(1);
                }
                if nth.is_some() && dispensable(&knots[0]) {
                    knots = vec![positional(&knots[0])];
                }
            }
        }

        for knot in &mut knots {
            knot.level = level;
        }
        knots
    }

    fn id_knot(&self, node: &ElementHandle<'_>) -> Vec<Knot> {
        match node.id() {
            Some(id) if self.options.id_name && !id.is_empty() => {
                vec![knot(format!("#{}", escape_ident(id)), ID_PENALTY)]
            }
            _ => Vec::new(),
        }
    }

    fn attribute_knots(&self, node: &ElementHandle<'_>) -> Vec<Knot> {
        self.options
            .attributes
            .iter()
            .filter_map(|name| {
                node.attr(name).map(|value| {
                    knot(
                        format!("[{}={}]", escape_ident(name), quote_attr_value(value)),
                        ATTRIBUTE_PENALTY,
                    )
                })
            })
            .collect()
    }

    fn class_knots(&self, node: &ElementHandle<'_>) -> Vec<Knot> {
        node.classes()
            .into_iter()
            .filter(|class| self.options.class_name.admits(class))
            .map(|class| knot(format!(".{}", escape_ident(class)), CLASS_PENALTY))
            .collect()
    }

    fn unique_path(&self, stack: &[Vec<Knot>]) -> Uniqueness {
        let total = stack
            .iter()
            .fold(1usize, |acc, level| acc.saturating_mul(level.len()));
        if total > self.options.threshold {
            return Uniqueness::TooMany;
        }

        let mut paths = combinations(stack);
        paths.sort_by(|a, b| penalty(a).total_cmp(&penalty(b)));
        paths
            .into_iter()
            .find(|path| self.is_unique(path))
            .map_or(Uniqueness::Missing, Uniqueness::Found)
    }

    fn is_unique(&self, path: &[Knot]) -> bool {
        let css = selector_of(path);
        match self.element.document().count(&css) {
            Ok(count) => count == 1,
            Err(err) => {
                debug!(selector = %css, error = %err, "generated selector rejected by parser");
                false
            }
        }
    }

    fn selects_element(&self, path: &[Knot]) -> bool {
        let css = selector_of(path);
        matches!(
            self.element.document().query_selector_all(&css).as_deref(),
            Ok([only]) if *only == self.element
        )
    }

    fn optimize(&self, path: &[Knot], tries: &mut usize, visited: &mut HashSet<String>, out: &mut Vec<Path>) {
        if path.len() <= 2 || path.len() <= self.options.optimized_min_length {
            return;
        }
        for index in 1..path.len() - 1 {
            if *tries > self.options.max_number_of_tries {
                return;
            }
            *tries += 1;
            let mut shorter = path.to_vec();
            shorter.remove(index);
            let key = selector_of(&shorter);
            if !visited.insert(key) {
                continue;
            }
            if self.selects_element(&shorter) {
                self.optimize(&shorter, tries, visited, out);
                out.push(shorter);
            }
        }
    }
}

fn knot(name: String, penalty: f64) -> Knot {
    Knot { name, penalty, level: 0 }
}

fn dispensable(knot: &Knot) -> bool {
    knot.name != "html" && !knot.name.starts_with('#')
}

fn penalty(path: &[Knot]) -> f64 {
    path.iter().map(|knot| knot.penalty).sum()
}

fn combinations(stack: &[Vec<Knot>]) -> Vec<Path> {
    let mut paths: Vec<Path> = vec![Vec::new()];
    for level in stack {
        paths = paths
            .into_iter()
            .flat_map(|prefix| {
                level.iter().map(move |knot| {
                    let mut path = prefix.clone();
                    path.push(knot.clone());
                    path
                })
            })
            .collect();
    }
    paths
}

/// Render a leaf-first path as CSS, using `>` between adjacent levels
fn selector_of(path: &[Knot]) -> String {
    let Some(first) = path.first() else {
        return String::new();
    };
    let mut query = first.name.clone();
    let mut previous = first;
    for knot in &path[1..] {
        query = if knot.level == previous.level + 1 {
            format!("{} > {}", knot.name, query)
        } else {
            format!("{} {}", knot.name, query)
        };
        previous = knot;
    }
    query
}
