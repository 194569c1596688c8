use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::api::{apply_override, validate, POLICY_PATHS};
use crate::defaults::default_policy;
use crate::errors::PolicyError;
use crate::model::{LocatorPolicy, PolicySource};

const ENV_PREFIX: &str = "WAYPOINT_POLICY__";
const ENV_JSON: &str = "WAYPOINT_POLICY_OVERRIDE_JSON";

/// `section -> key -> value`, the shape of every policy overlay
type Sections = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Default)]
pub struct LoadOptions {
    /// YAML files applied in order; missing files are skipped
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
}

/// Defaults, then `path` (if it exists), then environment overlays.
pub fn load_policy(path: Option<&Path>) -> Result<LocatorPolicy, PolicyError> {
    load_policy_with_options(&LoadOptions {
        paths: path.map(Path::to_path_buf).into_iter().collect(),
        include_env: true,
    })
}

pub fn load_policy_with_options(options: &LoadOptions) -> Result<LocatorPolicy, PolicyError> {
    let mut policy = default_policy();
    for path in POLICY_PATHS {
        policy.set_provenance(path, PolicySource::Builtin);
    }

    for path in &options.paths {
        if !path.exists() {
            debug!(path = %path.display(), "policy file not found; skipped");
            continue;
        }
        let content = fs::read_to_string(path).map_err(|err| PolicyError::Io(err.to_string()))?;
        let sections: Sections =
            serde_yaml::from_str(&content).map_err(|err| PolicyError::Invalid(format!("{}: {err}", path.display())))?;
        debug!(path = %path.display(), sections = sections.len(), "applying policy file");
        apply_sections(&mut policy, sections, PolicySource::File)?;
    }

    if options.include_env {
        apply_env(&mut policy)?;
    }

    validate(&policy)?;
    Ok(policy)
}

fn apply_sections(policy: &mut LocatorPolicy, sections: Sections, source: PolicySource) -> Result<(), PolicyError> {
    for (section, keys) in sections {
        for (key, value) in keys {
            let path = format!("{}.{}", section.trim().to_ascii_lowercase(), key.trim().to_ascii_lowercase());
            apply_override(policy, &path, &value, source)?;
        }
    }
    Ok(())
}

/// `WAYPOINT_POLICY__SECTION__KEY=value` variables first, then the JSON blob
fn apply_env(policy: &mut LocatorPolicy) -> Result<(), PolicyError> {
    let mut variables: Vec<(String, String)> = env::vars()
        .filter_map(|(name, raw)| {
            let path = name.strip_prefix(ENV_PREFIX)?.replace("__", ".").to_ascii_lowercase();
            Some((path, raw))
        })
        .collect();
    variables.sort();
    for (path, raw) in variables {
        apply_override(policy, &path, &parse_env_value(&raw), PolicySource::Env)?;
    }

    if let Ok(raw) = env::var(ENV_JSON) {
        if !raw.trim().is_empty() {
            let sections: Sections = serde_json::from_str(&raw)
                .map_err(|err| PolicyError::Invalid(format!("{ENV_JSON}: {err}")))?;
            apply_sections(policy, sections, PolicySource::Env)?;
        }
    }
    Ok(())
}

/// JSON when it parses (`5`, `["name"]`), otherwise the raw string
fn parse_env_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
