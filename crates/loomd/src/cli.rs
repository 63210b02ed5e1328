use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use loom_core::Interpreter;
use loom_observe::{LoggerConfig, LoggerFormat};

/// Local process supervisor.
#[derive(Debug, Parser)]
#[command(name = "loomd", version)]
pub struct Cli {
    /// Configuration file; re-read on change and on SIGHUP
    pub config: PathBuf,

    /// Log filter directive (e.g. `info`, `loom.core=debug`)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format: text, json or journald
    #[arg(long, default_value = "text")]
    pub log_format: LoggerFormat,

    /// Serve the HTTP command API on this address
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Program that runs non-executable sources
    #[arg(long, default_value = "node")]
    pub interpreter: String,

    /// Search path variable seeded for interpreted tasks; empty disables it
    #[arg(long, default_value = "NODE_PATH")]
    pub interpreter_path_var: String,
}

impl Cli {
    pub fn logger(&self) -> LoggerConfig {
        LoggerConfig::default()
            .with_format(self.log_format)
            .with_level(self.log_level.clone())
    }

    pub fn interpreter(&self) -> Interpreter {
        let var = self.interpreter_path_var.trim();
        Interpreter {
            program: self.interpreter.clone(),
            search_path_var: (!var.is_empty()).then(|| var.to_string()),
        }
    }
}
