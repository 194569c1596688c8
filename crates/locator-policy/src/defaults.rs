use crate::model::{FramePolicy, GenerationPolicy, LocatorPolicy, PrecisionScale};

pub const DEFAULT_ATTRIBUTES: &[&str] = &[
    "name",
    "type",
    "role",
    "aria-label",
    "placeholder",
    "title",
    "alt",
    "for",
    "data-testid",
    "data-test",
    "data-cy",
];

pub fn default_policy() -> LocatorPolicy {
    LocatorPolicy {
        rev: 1,
        generation: GenerationPolicy {
            seed_min_length: 1,
            optimized_min_length: 2,
            threshold: 1_000,
            max_number_of_tries: 10_000,
            attribute_allow_list: DEFAULT_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
        },
        precision: PrecisionScale {
            looser: 1.0,
            loose: 3.0,
            medium: 5.0,
            stricter: 8.0,
            strictest: 10.0,
        },
        frames: FramePolicy { max_depth: 8 },
        provenance: Default::default(),
    }
}
