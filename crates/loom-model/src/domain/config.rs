use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{Argument, ConfigError, EnvSpec, GroupName, TimeoutMs};

/// Grace period between SIGINT and SIGTERM when none is configured.
pub const DEFAULT_TIMEOUT_MS: TimeoutMs = 1000;
/// Minimal lifetime before a dirty exit may be respawned when none is configured.
pub const DEFAULT_RUNTIME_MS: TimeoutMs = 1000;

/// Configuration document as written on disk.
///
/// Parsing is strict: unknown keys are rejected at every level.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Optional base directory (relative to the file) for every task `cwd`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Task group declarations keyed by group name.
    pub tasks: BTreeMap<GroupName, TaskDecl>,
}

/// One task group as declared in the configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDecl {
    pub count: usize,
    pub source: String,
    #[serde(default)]
    pub executable: bool,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub env: EnvSpec,
    #[serde(default)]
    pub persistent: bool,
    #[serde(default)]
    pub timeout: Option<TimeoutMs>,
    #[serde(default)]
    pub runtime: Option<TimeoutMs>,
    #[serde(default)]
    pub watch: Vec<String>,
}

/// Validated, fully resolved parameters of one task group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    /// Group name (identity key in the registry).
    pub name: GroupName,
    /// Desired number of concurrently running slots.
    pub count: usize,
    /// Executable or script to run.
    pub source: String,
    /// Run `source` directly instead of through the interpreter.
    pub executable: bool,
    /// Absolute working directory of every slot.
    pub cwd: PathBuf,
    /// Argument template.
    pub arguments: Vec<Argument>,
    /// Environment declaration.
    pub env: EnvSpec,
    /// Respawn slots after a non-zero exit.
    pub persistent: bool,
    /// Milliseconds between SIGINT and SIGTERM.
    pub timeout_ms: TimeoutMs,
    /// Minimal lifetime (ms) before a dirty exit is respawned.
    pub runtime_ms: TimeoutMs,
    /// Glob patterns whose changes restart the whole group.
    pub watch: Vec<String>,
}

impl TaskConfig {
    /// Parameters with every optional field at its default.
    pub fn new(name: impl Into<GroupName>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            source: source.into(),
            executable: false,
            cwd: PathBuf::from("."),
            arguments: Vec::new(),
            env: EnvSpec::new(),
            persistent: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            runtime_ms: DEFAULT_RUNTIME_MS,
            watch: Vec::new(),
        }
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[inline]
    pub fn runtime(&self) -> Duration {
        Duration::from_millis(self.runtime_ms)
    }
}

/// A validated configuration: every declared group, ordered by name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    pub tasks: Vec<TaskConfig>,
}

impl Config {
    /// Parse and validate configuration text.
    ///
    /// `base` is the directory relative `path`/`cwd` entries are resolved
    /// against (the configuration file's directory).
    pub fn parse(text: &str, base: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(text)?;
        file.validate(base)
    }

    pub fn get(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl ConfigFile {
    /// Check the rules the schema cannot express and resolve defaults.
    pub fn validate(self, base: &Path) -> Result<Config, ConfigError> {
        if self.tasks.is_empty() {
            return Err(ConfigError::NoTasks);
        }

        let root = match &self.path {
            Some(path) => base.join(path),
            None => base.to_path_buf(),
        };

        let mut tasks = Vec::with_capacity(self.tasks.len());
        for (name, decl) in self.tasks {
            tasks.push(decl.validate(name, &root)?);
        }
        Ok(Config { tasks })
    }
}

impl TaskDecl {
    fn validate(self, name: GroupName, root: &Path) -> Result<TaskConfig, ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidName(name));
        }
        if self.source.trim().is_empty() {
            return Err(ConfigError::EmptySource { task: name });
        }

        for (position, arg) in self.arguments.iter().enumerate() {
            if let Argument::PerInstance(values) = arg
                && values.len() != self.count
            {
                return Err(ConfigError::ArgumentCount {
                    task: name,
                    position,
                    expected: self.count,
                    found: values.len(),
                });
            }
        }

        if self.watch.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::EmptyPattern { task: name });
        }

        let cwd = normalize(&root.join(self.cwd.unwrap_or_else(|| PathBuf::from("."))));

        Ok(TaskConfig {
            name,
            count: self.count,
            source: self.source,
            executable: self.executable,
            cwd,
            arguments: self.arguments,
            env: self.env,
            persistent: self.persistent,
            timeout_ms: self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS),
            runtime_ms: self.runtime.unwrap_or(DEFAULT_RUNTIME_MS),
            watch: self.watch,
        })
    }
}

/// Lexically drop `.` and fold `..` so equal directories compare equal.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
