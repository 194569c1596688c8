use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Effective configuration of the locator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LocatorPolicy {
    pub rev: u64,
    pub generation: GenerationPolicy,
    pub precision: PrecisionScale,
    pub frames: FramePolicy,
    #[serde(default)]
    pub provenance: HashMap<String, PolicyProvenance>,
}

/// Effort bounds for the minimal-selector search
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationPolicy {
    /// Levels collected before the first uniqueness check
    pub seed_min_length: usize,
    /// Paths at or below this length are not optimised further
    pub optimized_min_length: usize,
    /// Maximum number of path combinations examined per search limit
    pub threshold: usize,
    /// Maximum number of optimisation attempts
    pub max_number_of_tries: usize,
    /// Attributes the attribute-driven profiles may use
    pub attribute_allow_list: Vec<String>,
}

/// Precision rate (0..=10) each precision level demands of a degraded match
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrecisionScale {
    pub looser: f64,
    pub loose: f64,
    pub medium: f64,
    pub stricter: f64,
    pub strictest: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FramePolicy {
    /// Deepest frame nesting level enumerated
    pub max_depth: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyProvenance {
    pub path: String,
    pub source: PolicySource,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicySource {
    Builtin,
    File,
    Env,
}

impl LocatorPolicy {
    pub fn set_provenance(&mut self, path: &str, source: PolicySource) {
        self.provenance.insert(
            path.to_string(),
            PolicyProvenance {
                path: path.to_string(),
                source,
            },
        );
    }

    pub fn source_of(&self, path: &str) -> Option<PolicySource> {
        self.provenance.get(path).map(|entry| entry.source)
    }
}

impl PrecisionScale {
    /// Thresholds in order from loosest to strictest
    pub fn ordered(&self) -> [f64; 5] {
        [
            self.looser,
            self.loose,
            self.medium,
            self.stricter,
            self.strictest,
        ]
    }
}
