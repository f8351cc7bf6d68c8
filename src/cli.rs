use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::recommend::Priority;

#[derive(Parser)]
#[command(name = "dotwin")]
#[command(author = "dotwin contributors")]
#[command(version)]
#[command(about = "Declarative configuration for Windows 11", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also append log lines to this file
    #[arg(long, global = true, env = "DOTWIN_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Make the system match a configuration document
    Apply(ApplyArgs),

    /// Check which items of a configuration document are compliant
    Test(TestArgs),

    /// Show what apply would change
    Status(StatusArgs),

    /// Collect a system profile
    Profile(ProfileArgs),

    /// Suggest configuration changes for this machine
    Recommend(RecommendArgs),

    /// Manage recommendation plugins
    #[command(subcommand)]
    Plugins(PluginsCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Configuration document (path, or name in the config directory)
    pub config: String,

    /// Only apply matching items: `type`, `type.name` or `.name`
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show what would change without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Stop at the first failing item
    #[arg(long)]
    pub fail_fast: bool,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct TestArgs {
    /// Configuration document (path, or name in the config directory)
    pub config: String,

    /// Only test matching items: `type`, `type.name` or `.name`
    #[arg(short, long)]
    pub target: Option<String>,

    /// Test items on a worker pool
    #[arg(long)]
    pub parallel: bool,

    /// Worker count for --parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Write results as JSON to this path
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Configuration document (path, or name in the config directory)
    pub config: String,

    /// Only show matching items: `type`, `type.name` or `.name`
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Save the profile as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    /// Use a saved profile instead of querying the system
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Only this category
    #[arg(short, long)]
    pub category: Option<String>,

    /// Minimum priority (critical, high, medium, low)
    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Show at most this many
    #[arg(short, long)]
    pub max: Option<usize>,

    /// Load these plugins first
    #[arg(long = "plugin")]
    pub plugins: Vec<String>,

    /// Also load the plugins listed in this document's settings
    #[arg(long)]
    pub config: Option<String>,

    /// Write recommendations as JSON to this path
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Apply the recommendations
    #[arg(long)]
    pub apply: bool,

    /// With --apply, show what would change without changing anything
    #[arg(short = 'n', long, requires = "apply")]
    pub dry_run: bool,

    /// With --apply, do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum PluginsCommand {
    /// List available plugins
    List,
}
