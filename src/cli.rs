// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `shelfjobs`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "shelfjobs",
    version,
    about = "Run library background jobs with progress reporting.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Shelfjobs.toml")]
    pub config: String,

    /// Schedule only this job from the config.
    #[arg(long, value_name = "NAME")]
    pub job: Option<String>,

    /// Interrupt a running instance of each job before scheduling it,
    /// regardless of the job's own setting.
    #[arg(long)]
    pub stop_if_running: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SHELFJOBS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the jobs and their keys, but run nothing.
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

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
