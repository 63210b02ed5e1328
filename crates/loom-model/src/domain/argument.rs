use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ModelError, SlotId};

/// Single scalar argument value as written in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Flag(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

/// One position of a group's argument template.
///
/// A shared value lands at the same position in every slot's argv; a
/// per-instance list holds one value per slot id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Shared(Scalar),
    PerInstance(Vec<Scalar>),
}

impl Argument {
    /// Value used by slot `id`.
    pub fn for_slot(&self, id: SlotId) -> Option<String> {
        match self {
            Argument::Shared(v) => Some(v.to_string()),
            Argument::PerInstance(values) => values.get(id).map(Scalar::to_string),
        }
    }
}

/// Expand an argument template into the concrete argv of slot `id`.
///
/// Per-instance lists are validated against `count` when the configuration
/// is accepted; a short list here means the template and the slot count
/// drifted apart and is reported as [`ModelError::MissingArgument`].
pub fn expand_arguments(template: &[Argument], id: SlotId) -> Result<Vec<String>, ModelError> {
    template
        .iter()
        .enumerate()
        .map(|(position, arg)| {
            arg.for_slot(id)
                .ok_or(ModelError::MissingArgument { position, slot: id })
        })
        .collect()
}
