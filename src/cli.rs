use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

use crate::plan::FlagPolicy;

#[derive(Parser, Debug)]
#[command(name = "svcplan", version, about)]
pub struct Args {
    /// Selection file with `module-selected = [...]` (overrides SVCPLAN_SELECT)
    #[arg(value_name = "SELECTION")]
    pub selection: Option<PathBuf>,

    /// Path to the module manifest (overrides SVCPLAN_MANIFEST and ./apps.toml)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Extra root module, appended after the selection file's roots
    #[arg(long = "root", value_name = "NAME")]
    pub roots: Vec<String>,

    /// Whether folded modules contribute their build flags
    #[arg(long, value_enum)]
    pub flag_policy: Option<FlagPolicy>,

    /// Write the Rust service table here (overrides [emit].rust)
    #[arg(long)]
    pub rust_out: Option<PathBuf>,

    /// Write the Makefile fragment here (overrides [emit].make)
    #[arg(long)]
    pub make_out: Option<PathBuf>,

    /// Print the plan as JSON on stdout, ahead of any printed fragments
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Print generated files on stdout instead of writing them
    #[arg(long, default_value_t = false)]
    pub stdout: bool,

    /// Print a resolution report
    #[arg(long, value_enum, default_value_t = ReportMode::Off)]
    pub report: ReportMode,

    /// Write the report to a file instead of stderr
    #[arg(long)]
    pub report_out: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportMode {
    Off,
    Summary,
    Full,
}
