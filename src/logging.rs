// src/logging.rs

//! Logging setup for `chaindag` using `tracing` + `tracing-subscriber`.
//!
//! Filter directives come from, in order:
//! 1. `--log-level` CLI flag (applies to `chaindag` only; dependencies stay at `warn`)
//! 2. `CHAINDAG_LOG`, as full `EnvFilter` directives (e.g. `chaindag::dag=debug,info`)
//! 3. `info`
//!
//! Logs are sent to STDERR; run summaries and stats go to STDOUT. Worker
//! threads are named after their pool (`chaindag-cpu--1-0`,
//! `chaindag-cuda-1-3`, `sim-gpu0-s1`), so the thread name shows where a
//! chain ran. At `trace` the per-operator spans also log their duration when
//! they close.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::cli::LogLevel;

const ENV_VAR: &str = "CHAINDAG_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(ENV_VAR).ok();
    let directives = filter_directives(cli_level, env.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter '{directives}'"))?;

    let trace_spans = matches!(cli_level, Some(LogLevel::Trace));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_span_events(if trace_spans {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn filter_directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    if let Some(lvl) = cli_level {
        return format!("warn,chaindag={}", level_name(lvl));
    }
    match env.map(str::trim) {
        Some(env) if !env.is_empty() => env.to_lowercase(),
        _ => "info".to_string(),
    }
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_scopes_to_the_crate() {
        assert_eq!(
            filter_directives(Some(LogLevel::Debug), Some("trace")),
            "warn,chaindag=debug"
        );
    }

    #[test]
    fn env_directives_pass_through() {
        let directives = filter_directives(None, Some(" chaindag::dag=DEBUG,info "));
        assert_eq!(directives, "chaindag::dag=debug,info");
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn falls_back_to_info() {
        assert_eq!(filter_directives(None, None), "info");
        assert_eq!(filter_directives(None, Some("  ")), "info");
    }
}
