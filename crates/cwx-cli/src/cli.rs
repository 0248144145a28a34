//! CLI argument definitions for the context/notification tools.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cwx",
    version,
    about = "Clinical workstation context tools - inspect and replay notification backlogs",
    long_about = "Inspect flat notification records and replay inbox processing sessions\n\
                  against an in-memory patient context, the way the workstation's\n\
                  shared-context engine drives them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow patient-identifying values (PHI) in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse a file of flat notification records and print them.
    Parse(ParseArgs),

    /// Replay a notification processing session over a record file.
    Drain(DrainArgs),
}

#[derive(Parser)]
pub struct ParseArgs {
    /// File with one flat notification record per line.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Record lifecycle to parse.
    #[arg(long = "kind", value_enum, default_value = "delivered")]
    pub kind: RecordKindArg,
}

#[derive(Parser)]
pub struct DrainArgs {
    /// File with one delivered-notification record per line.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Alert types to auto-dispatch through a logging handler (repeatable).
    #[arg(long = "handle", value_name = "TYPE")]
    pub handle: Vec<String>,

    /// Scripted answers applied in order whenever an item is presented.
    /// When the script runs out, remaining prompts are skipped.
    #[arg(
        long = "actions",
        value_enum,
        value_delimiter = ',',
        value_name = "ACTION"
    )]
    pub actions: Vec<ActionArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordKindArg {
    Delivered,
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Skip,
    SkipAll,
    Delete,
    DeleteAll,
    Cancel,
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
