use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Declared value of one environment variable of a task group.
///
/// Serialized the same way it is written in the configuration file:
/// `true` inherits the supervisor's value, `false` forces the variable off,
/// anything else is used literally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEnvValue", into = "RawEnvValue")]
pub enum EnvValue {
    /// Copy the value from the supervisor environment (if it has one).
    Inherit,
    /// Make sure the variable is absent in the child.
    Unset,
    /// Use the given value verbatim.
    Literal(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawEnvValue {
    Flag(bool),
    Text(String),
    Number(serde_json::Number),
}

impl From<RawEnvValue> for EnvValue {
    fn from(raw: RawEnvValue) -> Self {
        match raw {
            RawEnvValue::Flag(true) => EnvValue::Inherit,
            RawEnvValue::Flag(false) => EnvValue::Unset,
            RawEnvValue::Text(s) => EnvValue::Literal(s),
            RawEnvValue::Number(n) => EnvValue::Literal(n.to_string()),
        }
    }
}

impl From<EnvValue> for RawEnvValue {
    fn from(value: EnvValue) -> Self {
        match value {
            EnvValue::Inherit => RawEnvValue::Flag(true),
            EnvValue::Unset => RawEnvValue::Flag(false),
            EnvValue::Literal(s) => RawEnvValue::Text(s),
        }
    }
}

/// Environment declaration of a task group, keyed by variable name.
pub type EnvSpec = BTreeMap<String, EnvValue>;

/// Variables every child receives from the supervisor unless overridden.
pub const SEEDED_VARS: [&str; 2] = ["HOME", "PATH"];

/// Build the concrete environment of a child process.
///
/// `ambient` looks up the supervisor's own environment. `HOME` and `PATH`
/// are always seeded as [`EnvValue::Inherit`], `search_path_var` (the
/// interpreter's module path) only when it is given. Declared entries win
/// over the seeds; an inherited variable missing from the ambient
/// environment is simply not set.
pub fn resolve_env<F>(ambient: F, declared: &EnvSpec, search_path_var: Option<&str>) -> BTreeMap<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut plan: BTreeMap<&str, &EnvValue> = BTreeMap::new();
    let inherit = EnvValue::Inherit;

    for key in SEEDED_VARS.iter().copied().chain(search_path_var) {
        plan.insert(key, &inherit);
    }
    for (key, value) in declared {
        plan.insert(key.as_str(), value);
    }

    plan.into_iter()
        .filter_map(|(key, value)| {
            let resolved = match value {
                EnvValue::Inherit => ambient(key),
                EnvValue::Unset => None,
                EnvValue::Literal(s) => Some(s.clone()),
            };
            resolved.map(|v| (key.to_string(), v))
        })
        .collect()
}
