//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    case::CaseCommands, completions::CompletionsArgs, device::DeviceCommands,
    import::ImportCommands, init::InitArgs, inventory::InventoryCommands, job::JobCommands,
    store::StoreCommands, sweep::SweepArgs,
};

#[derive(Parser)]
#[command(name = "kitroom")]
#[command(author, version, about = "Rental equipment inventory engine")]
#[command(long_about = "Tracks rental devices, assigns them to jobs, groups them into cases and frees them when jobs are paid. Data lives in a local SQLite database under .kitroom/.")]
#[command(propagate_version = true)]
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

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .kitroom/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new kitroom project
    Init(InitArgs),

    /// Load catalog or devices from files
    #[command(subcommand)]
    Import(ImportCommands),

    /// Browse the inventory
    #[command(subcommand)]
    Inventory(InventoryCommands),

    /// Device status and availability
    #[command(subcommand)]
    Device(DeviceCommands),

    /// Assign devices to jobs
    #[command(subcommand)]
    Job(JobCommands),

    /// Group devices into cases
    #[command(subcommand)]
    Case(CaseCommands),

    /// Free the devices of paid jobs
    Sweep(SweepArgs),

    /// Inspect the inventory database
    #[command(subcommand)]
    Store(StoreCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for single results, tsv for lists)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}
