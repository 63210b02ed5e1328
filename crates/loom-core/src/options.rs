use std::{fmt, path::PathBuf, sync::Arc};

/// Lookup into the environment the supervisor itself runs with.
pub type Ambient = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Binary that runs non-executable sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    /// Program invoked with the source as its first argument.
    pub program: String,
    /// Module search path variable seeded into interpreted children.
    pub search_path_var: Option<String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
            search_path_var: Some("NODE_PATH".to_string()),
        }
    }
}

/// Static settings of a supervisor instance.
#[derive(Clone)]
pub struct SupervisorOptions {
    /// Base directory for configuration text without a file origin.
    pub cwd: PathBuf,
    pub interpreter: Interpreter,
    pub ambient: Ambient,
}

impl SupervisorOptions {
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_interpreter(mut self, interpreter: Interpreter) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Replace the process environment lookup (used by tests and embedders).
    pub fn with_ambient<F>(mut self, ambient: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.ambient = Arc::new(ambient);
        self
    }
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            interpreter: Interpreter::default(),
            ambient: Arc::new(|key| std::env::var(key).ok()),
        }
    }
}

impl fmt::Debug for SupervisorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorOptions")
            .field("cwd", &self.cwd)
            .field("interpreter", &self.interpreter)
            .finish_non_exhaustive()
    }
}
