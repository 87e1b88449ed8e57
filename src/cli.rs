// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::loader::default_net_path;

/// Command-line arguments for `chaindag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "chaindag",
    version,
    about = "Run a DAG of operator chains on device worker pools.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the chain file (TOML).
    ///
    /// Default: `Chaindag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_net_path())]
    pub net: PathBuf,

    /// Number of times to run the net.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub iterations: u32,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CHAINDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the chain graph, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_one_iteration_of_the_default_file() {
        let args = CliArgs::try_parse_from(["chaindag"]).unwrap();
        assert_eq!(args.net, default_net_path());
        assert_eq!(args.iterations, 1);
        assert!(!args.dry_run);
        assert!(args.log_level.is_none());
    }

    #[test]
    fn parses_all_flags() {
        let args = CliArgs::try_parse_from([
            "chaindag",
            "--net",
            "nets/demo.toml",
            "--iterations",
            "3",
            "--log-level",
            "debug",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.net, PathBuf::from("nets/demo.toml"));
        assert_eq!(args.iterations, 3);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.dry_run);
    }
}
