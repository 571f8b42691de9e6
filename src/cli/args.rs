//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    cmd::CmdCommands, completions::CompletionsArgs, history::HistoryArgs, import::ImportArgs,
    init::InitArgs, node::NodeCommands, platform::PlatformCommands, vendor::VendorCommands,
};

#[derive(Parser)]
#[command(name = "pxo")]
#[command(author, version, about = "Per-vendor device command taxonomy")]
#[command(
    long_about = "Keep a catalogue of device CLI commands grouped into per-vendor category trees, with bulk CSV import."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Workspace root (default: auto-detect by finding .pxo/)
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Act as this user instead of the configured one
    #[arg(long = "as", global = true, value_name = "USER")]
    pub as_user: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new pxo workspace
    Init(InitArgs),

    /// Vendor management
    #[command(subcommand)]
    Vendor(VendorCommands),

    /// Platform (OS) management
    #[command(subcommand)]
    Platform(PlatformCommands),

    /// Grouping node (category/tag) management
    #[command(subcommand)]
    Node(NodeCommands),

    /// Command management
    #[command(subcommand)]
    Cmd(CmdCommands),

    /// Import commands from a CSV export
    Import(ImportArgs),

    /// Show past imports
    History(HistoryArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Tables and coloured summaries
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
    /// Tab-separated values (for piping)
    Tsv,
    /// CSV format (for spreadsheets)
    Csv,
}

impl OutputFormat {
    /// Resolve `auto` against the configured default format
    pub fn resolve(self, configured: Option<&str>) -> Self {
        match self {
            OutputFormat::Auto => configured
                .and_then(|s| OutputFormat::from_str(s, true).ok())
                .unwrap_or(OutputFormat::Auto),
            f => f,
        }
    }

    /// JSON or YAML
    pub fn is_structured(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Yaml)
    }
}
