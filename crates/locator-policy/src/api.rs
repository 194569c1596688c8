use serde_json::Value;

use crate::errors::PolicyError;
use crate::model::{LocatorPolicy, PolicySource};

/// Every path [`apply_override`] accepts
pub const POLICY_PATHS: &[&str] = &[
    "generation.seed_min_length",
    "generation.optimized_min_length",
    "generation.threshold",
    "generation.max_number_of_tries",
    "generation.attribute_allow_list",
    "precision.looser",
    "precision.loose",
    "precision.medium",
    "precision.stricter",
    "precision.strictest",
    "frames.max_depth",
];

/// Apply one dotted-path override (e.g. `generation.threshold`) to `policy`.
pub fn apply_override(
    policy: &mut LocatorPolicy,
    path: &str,
    value: &Value,
    source: PolicySource,
) -> Result<(), PolicyError> {
    let changed = match path {
        "generation.seed_min_length" => {
            merge(&mut policy.generation.seed_min_length, to_usize(value)?)
        }
        "generation.optimized_min_length" => {
            merge(&mut policy.generation.optimized_min_length, to_usize(value)?)
        }
        "generation.threshold" => merge(&mut policy.generation.threshold, to_usize(value)?),
        "generation.max_number_of_tries" => {
            merge(&mut policy.generation.max_number_of_tries, to_usize(value)?)
        }
        "generation.attribute_allow_list" => merge(
            &mut policy.generation.attribute_allow_list,
            to_string_list(value)?,
        ),
        "precision.looser" => merge(&mut policy.precision.looser, to_rate(value)?),
        "precision.loose" => merge(&mut policy.precision.loose, to_rate(value)?),
        "precision.medium" => merge(&mut policy.precision.medium, to_rate(value)?),
        "precision.stricter" => merge(&mut policy.precision.stricter, to_rate(value)?),
        "precision.strictest" => merge(&mut policy.precision.strictest, to_rate(value)?),
        "frames.max_depth" => merge(&mut policy.frames.max_depth, to_usize(value)?),
        path => return Err(PolicyError::UnsupportedPath(path.to_string())),
    };
    if changed {
        policy.rev += 1;
    }
    policy.set_provenance(path, source);
    Ok(())
}

/// Reject policies the locator cannot run with.
pub fn validate(policy: &LocatorPolicy) -> Result<(), PolicyError> {
    let generation = &policy.generation;
    if generation.seed_min_length == 0 {
        return Err(PolicyError::Invalid(
            "generation.seed_min_length must be > 0".into(),
        ));
    }
    if generation.threshold == 0 || generation.max_number_of_tries == 0 {
        return Err(PolicyError::Invalid(
            "generation.threshold and generation.max_number_of_tries must be > 0".into(),
        ));
    }
    let scale = policy.precision.ordered();
    if scale.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(PolicyError::Invalid(format!(
            "precision scale must not decrease from looser to strictest: {scale:?}"
        )));
    }
    Ok(())
}

fn merge<T: PartialEq>(target: &mut T, candidate: T) -> bool {
    if *target == candidate {
        return false;
    }
    *target = candidate;
    true
}

fn to_usize(value: &Value) -> Result<usize, PolicyError> {
    value
        .as_u64()
        .map(|v| v as usize)
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected non-negative integer, got {value}")))
}

fn to_rate(value: &Value) -> Result<f64, PolicyError> {
    let rate = value
        .as_f64()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected number, got {value}")))?;
    if !(0.0..=10.0).contains(&rate) {
        return Err(PolicyError::InvalidValue(format!(
            "precision rate {rate} outside 0..=10"
        )));
    }
    Ok(rate)
}

fn to_string_list(value: &Value) -> Result<Vec<String>, PolicyError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_ascii_lowercase())
                    .ok_or_else(|| PolicyError::InvalidValue(format!("expected string, got {item}")))
            })
            .collect(),
        Value::String(raw) => Ok(raw
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect()),
        other => Err(PolicyError::InvalidValue(format!(
            "expected list of strings, got {other}"
        ))),
    }
}
