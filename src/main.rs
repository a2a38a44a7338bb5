//! CLI entry point.
//!
//! Staging and layout failures abort with a non-zero exit; per-file
//! render errors do not (they are visible in the log and in the build
//! report, and partial rendering is acceptable by policy).

use anyhow::Result;
use clap::Parser;
use verdoc::build::run_build;
use verdoc::cli::Cli;
use verdoc::config::BuildConfig;
use verdoc::{logger, watch};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.log_level(), cli.log_file.as_deref())?;

    let config = BuildConfig::from_cli(&cli)?;
    if config.watch {
        run_build(config.clone())?;
        watch::watch(&config)?;
    } else {
        run_build(config)?;
    }
    Ok(())
}
