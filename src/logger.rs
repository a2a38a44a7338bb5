//! Logging utilities with colored module prefixes.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - process-wide verbosity filtering, set once at startup
//! - an optional plain-text log file sink
//!
//! # Example
//!
//! ```ignore
//! log!("render"; "{} -> {}", source.display(), dest.display());
//! log!(Level::Debug; "layout"; "dest wiped at {}", dest.display());
//! ```
//!
//! Build results that tests need to assert on are returned as data
//! (see [`crate::build::BuildReport`]); the log output is for humans.

use colored::{ColoredString, Colorize};
use std::{
    fs::{File, OpenOptions},
    io::{Write, stderr},
    path::Path,
    sync::{Mutex, OnceLock},
};

/// Verbosity threshold, highest wins.
///
/// `Quiet` still shows errors; `Normal` adds progress messages;
/// `Verbose` adds per-file detail; `Debug` adds directory bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

static LEVEL: OnceLock<Level> = OnceLock::new();
static FILE_SINK: OnceLock<Mutex<File>> = OnceLock::new();

/// Configure the logger. Later calls have no effect, so tests that
/// run builds in-process never fight over the sink.
pub fn init(level: Level, log_file: Option<&Path>) -> anyhow::Result<()> {
    let _ = LEVEL.set(level);
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let _ = FILE_SINK.set(Mutex::new(file));
    }
    Ok(())
}

fn level() -> Level {
    LEVEL.get().copied().unwrap_or_default()
}

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// log!(Level::Verbose; "module"; "only shown at -v and above");
/// ```
#[macro_export]
macro_rules! log {
    ($lvl:expr; $module:expr; $($arg:tt)*) => {{
        $crate::logger::log($lvl, $module, &format!($($arg)*))
    }};
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($crate::logger::Level::Normal, $module, &format!($($arg)*))
    }};
}

pub fn log(msg_level: Level, module: &str, message: &str) {
    // Errors bypass the threshold; everything else must clear it.
    let module_lower = module.to_ascii_lowercase();
    let is_error = module_lower == "error";
    if !is_error && (level() < msg_level || level() == Level::Quiet) {
        return;
    }

    let prefix = colorize_prefix(module, &module_lower);
    let mut out = stderr().lock();
    writeln!(out, "{prefix} {message}").ok();
    out.flush().ok();

    if let Some(sink) = FILE_SINK.get()
        && let Ok(mut file) = sink.lock()
    {
        writeln!(file, "[{module}] {message}").ok();
    }
}

fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "watch" => prefix.bright_green().bold(),
        "error" => prefix.bright_red().bold(),
        "warn" => prefix.bright_magenta().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}
