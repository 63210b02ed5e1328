use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Operator command applied to a group, a single slot, or everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Restart,
    Stop,
    Kill,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Restart => "restart",
            Action::Stop => "stop",
            Action::Kill => "kill",
        })
    }
}

impl FromStr for Action {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restart" => Ok(Action::Restart),
            "stop" => Ok(Action::Stop),
            "kill" => Ok(Action::Kill),
            _ => Err(ModelError::UnknownAction(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_agree() {
        for action in [Action::Restart, Action::Stop, Action::Kill] {
            assert_eq!(action.to_string().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn unknown_action() {
        assert!(matches!(
            "reload".parse::<Action>(),
            Err(ModelError::UnknownAction(a)) if a == "reload"
        ));
    }
}
