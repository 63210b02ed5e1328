use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Signals the supervisor knows how to deliver to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "SIGHUP")]
    Hangup,
    #[serde(rename = "SIGINT")]
    Interrupt,
    #[serde(rename = "SIGQUIT")]
    Quit,
    #[serde(rename = "SIGKILL")]
    Kill,
    #[serde(rename = "SIGUSR1")]
    User1,
    #[serde(rename = "SIGUSR2")]
    User2,
    #[serde(rename = "SIGTERM")]
    Terminate,
}

impl Signal {
    /// Conventional `SIG*` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Hangup => "SIGHUP",
            Signal::Interrupt => "SIGINT",
            Signal::Quit => "SIGQUIT",
            Signal::Kill => "SIGKILL",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
            Signal::Terminate => "SIGTERM",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = ModelError;

    /// Accepts `SIGTERM`, `TERM`, `sigterm` and the POSIX numbers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_uppercase();
        let name = norm.strip_prefix("SIG").unwrap_or(&norm);
        match name {
            "HUP" | "1" => Ok(Signal::Hangup),
            "INT" | "2" => Ok(Signal::Interrupt),
            "QUIT" | "3" => Ok(Signal::Quit),
            "KILL" | "9" => Ok(Signal::Kill),
            "USR1" | "10" => Ok(Signal::User1),
            "USR2" | "12" => Ok(Signal::User2),
            "TERM" | "15" => Ok(Signal::Terminate),
            _ => Err(ModelError::UnknownSignal(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_spellings() {
        assert_eq!("SIGTERM".parse::<Signal>().unwrap(), Signal::Terminate);
        assert_eq!("term".parse::<Signal>().unwrap(), Signal::Terminate);
        assert_eq!(" sigint ".parse::<Signal>().unwrap(), Signal::Interrupt);
        assert_eq!("9".parse::<Signal>().unwrap(), Signal::Kill);
    }

    #[test]
    fn rejects_unknown_names() {
        assert!(matches!(
            "SIGWINCH".parse::<Signal>(),
            Err(ModelError::UnknownSignal(_))
        ));
    }

    #[test]
    fn display_uses_sig_prefix() {
        assert_eq!(Signal::User2.to_string(), "SIGUSR2");
    }
}
