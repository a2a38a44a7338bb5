//! Command-line interface definitions.
//!
//! Defines all CLI arguments using clap. The CLI is a thin shell: it
//! collects overrides, hands them to [`crate::config::BuildConfig`], and
//! never touches the pipeline itself.

use clap::Parser;
use std::path::PathBuf;

/// Versioned documentation generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// A URI to a file path, git repository, or github "owner/name" shorthand
    pub uri: String,

    /// Destination directory for compiled documentation
    pub destination: PathBuf,

    /// An optional configuration file to read
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// A git branch to checkout
    #[arg(short = 'b', long)]
    pub branch: Option<String>,

    /// A git tag to checkout
    #[arg(short = 't', long)]
    pub tag: Option<String>,

    /// Root directory which docs are built from (relative to the staged tree)
    #[arg(short = 'r', long)]
    pub root_dir: Option<PathBuf>,

    /// Source directory to compile from (default: the root directory)
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Directory to look for assets (css, js & images) in
    #[arg(long)]
    pub assets_dir: Option<PathBuf>,

    /// Directory to look for templates in
    #[arg(long)]
    pub templates_dir: Option<PathBuf>,

    /// Parent directory for staging and checkout scratch space
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Base template name made available to documents
    #[arg(long)]
    pub base_template: Option<String>,

    /// File to duplicate log output into
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Re-render whenever a tracked source file changes
    #[arg(short = 'w', long)]
    pub watch: bool,

    /// Show per-file progress
    #[arg(short = 'v', long, conflicts_with_all = ["debug", "quiet"])]
    pub verbose: bool,

    /// Show directory bookkeeping detail
    #[arg(short = 'd', long, conflicts_with = "quiet")]
    pub debug: bool,

    /// Only show errors
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Cli {
    /// Map the verbosity flags onto a log level. Highest wins.
    pub fn log_level(&self) -> crate::logger::Level {
        use crate::logger::Level;
        if self.quiet {
            Level::Quiet
        } else if self.debug {
            Level::Debug
        } else if self.verbose {
            Level::Verbose
        } else {
            Level::Normal
        }
    }
}
