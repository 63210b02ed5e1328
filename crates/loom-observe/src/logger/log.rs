use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter,
    filter::{Directive, ParseError},
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

/// Target of supervised process output and lifecycle notices.
const TASK_TARGET: &str = "loom.task";

/// Install the global subscriber for `cfg`.
pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let registry = tracing_subscriber::registry().with(filter(&cfg.level)?);

    let installed = match cfg.format {
        LoggerFormat::Text => registry
            .with(
                fmt::layer()
                    .with_ansi(cfg.use_color)
                    .with_target(cfg.with_targets)
                    .with_timer(timer()),
            )
            .try_init(),
        LoggerFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(cfg.with_targets)
                    .with_timer(timer()),
            )
            .try_init(),
        LoggerFormat::Journald => {
            #[cfg(all(target_os = "linux", feature = "journald"))]
            {
                let journald = tracing_journald::layer().map_err(LoggerError::Journald)?;
                registry.with(journald).try_init()
            }

            #[cfg(not(all(target_os = "linux", feature = "journald")))]
            {
                return Err(LoggerError::JournaldUnavailable);
            }
        }
    };
    installed.map_err(|_| LoggerError::AlreadyInstalled)
}

/// `level` as given, plus `loom.task=info` unless `level` names that
/// target itself: task output survives a global `warn` or `error`.
fn filter(level: &str) -> Result<EnvFilter, LoggerError> {
    let invalid = |reason: String| LoggerError::InvalidFilter {
        directive: level.to_string(),
        reason,
    };

    let filter = EnvFilter::builder()
        .parse(level)
        .map_err(|e| invalid(e.to_string()))?;
    if level.contains(TASK_TARGET) {
        return Ok(filter);
    }

    let task: Directive = format!("{TASK_TARGET}=info")
        .parse()
        .map_err(|e: ParseError| invalid(e.to_string()))?;
    Ok(filter.add_directive(task))
}

// Local offset lookup fails once other threads run; loomd installs the
// logger first thing, and UTC is the fallback.
fn timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_output_stays_visible() {
        let rendered = filter("warn").unwrap().to_string();
        assert!(rendered.contains("loom.task=info"), "{rendered}");
    }

    #[test]
    fn explicit_task_level_wins() {
        let rendered = filter("info,loom.task=error").unwrap().to_string();
        assert!(rendered.contains("loom.task=error"), "{rendered}");
        assert!(!rendered.contains("loom.task=info"), "{rendered}");
    }

    #[test]
    fn bad_directive_is_reported() {
        let err = filter("loom.core=loud").unwrap_err();
        assert!(matches!(err, LoggerError::InvalidFilter { directive, .. } if directive == "loom.core=loud"));
    }

    #[test]
    fn second_install_is_refused() {
        let cfg = LoggerConfig::default();
        let first = install(&cfg);
        assert!(first.is_ok() || matches!(first, Err(LoggerError::AlreadyInstalled)));
        assert!(matches!(install(&cfg), Err(LoggerError::AlreadyInstalled)));
    }
}
