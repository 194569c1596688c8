//! Selector candidate generation
//!
//! The minimal-selector search runs once per constraint profile:
//! 1. tag-only - tag names
//! 2. id-only - ids
//! 3. class - class names and tag names
//! 4. attribute - allow-listed attributes
//! 5. combined - everything above
//! 6. class:<name> - one profile per distinct class of the element
//!
//! Profiles that find nothing are skipped; the union of the rest is the
//! element's [`SelectorSet`].

use std::fmt;

use tracing::debug;
use waypoint_dom_snapshot::ElementHandle;
use waypoint_policy_center::GenerationPolicy;

use crate::finder::{find_selector, ClassFilter, FinderOptions};
use crate::types::SelectorSet;

/// One constraint profile of the selector search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorProfile {
    TagOnly,
    IdOnly,
    Class,
    Attribute,
    Combined,
    /// Only this class, plus tag names
    SingleClass(String),
}

impl SelectorProfile {
    /// Profiles tried for every element, in order
    pub fn base_profiles() -> [SelectorProfile; 5] {
        [
            SelectorProfile::TagOnly,
            SelectorProfile::IdOnly,
            SelectorProfile::Class,
            SelectorProfile::Attribute,
            SelectorProfile::Combined,
        ]
    }

    /// Base profiles followed by one single-class profile per distinct class
    pub fn profiles_for(element: &ElementHandle<'_>) -> Vec<SelectorProfile> {
        let mut profiles = Self::base_profiles().to_vec();
        profiles.extend(
            element
                .classes()
                .into_iter()
                .map(|class| SelectorProfile::SingleClass(class.to_string())),
        );
        profiles
    }

    pub fn name(&self) -> String {
        match self {
            SelectorProfile::TagOnly => "tag-only".to_string(),
            SelectorProfile::IdOnly => "id-only".to_string(),
            SelectorProfile::Class => "class".to_string(),
            SelectorProfile::Attribute => "attribute".to_string(),
            SelectorProfile::Combined => "combined".to_string(),
            SelectorProfile::SingleClass(class) => format!("class:{class}"),
        }
    }

    /// Search options for this profile under the given effort bounds
    pub fn finder_options(&self, policy: &GenerationPolicy) -> FinderOptions {
        let (id_name, class_name, tag_name, use_attributes) = match self {
            SelectorProfile::TagOnly => (false, ClassFilter::None, true, false),
            SelectorProfile::IdOnly => (true, ClassFilter::None, false, false),
            SelectorProfile::Class => (false, ClassFilter::All, true, false),
            SelectorProfile::Attribute => (false, ClassFilter::None, false, true),
            SelectorProfile::Combined => (true, ClassFilter::All, true, true),
            SelectorProfile::SingleClass(class) => {
                (false, ClassFilter::Only(class.clone()), true, false)
            }
        };
        FinderOptions {
            id_name,
            class_name,
            tag_name,
            attributes: if use_attributes {
                policy.attribute_allow_list.clone()
            } else {
                Vec::new()
            },
            seed_min_length: policy.seed_min_length,
            optimized_min_length: policy.optimized_min_length,
            threshold: policy.threshold,
            max_number_of_tries: policy.max_number_of_tries,
        }
    }
}

impl fmt::Display for SelectorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Produces the candidate selectors describing one element
pub trait CandidateGenerator {
    fn generate(&self, element: &ElementHandle<'_>) -> SelectorSet;
}

/// Runs the minimal-selector search under every profile
#[derive(Debug, Clone)]
pub struct DefaultCandidateGenerator {
    policy: GenerationPolicy,
}

impl DefaultCandidateGenerator {
    pub fn new(policy: GenerationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GenerationPolicy {
        &self.policy
    }

    /// Run only the given profiles, in order
    pub fn generate_with_profiles(
        &self,
        element: &ElementHandle<'_>,
        profiles: &[SelectorProfile],
    ) -> SelectorSet {
        let mut selectors = SelectorSet::new();
        for profile in profiles {
            match find_selector(element, &profile.finder_options(&self.policy)) {
                Ok(selector) => {
                    selectors.insert(selector);
                }
                Err(err) => {
                    debug!(profile = %profile, element = %element, error = %err, "profile skipped");
                }
            }
        }
        selectors
    }
}

impl CandidateGenerator for DefaultCandidateGenerator {
    fn generate(&self, element: &ElementHandle<'_>) -> SelectorSet {
        self.generate_with_profiles(element, &SelectorProfile::profiles_for(element))
    }
}
