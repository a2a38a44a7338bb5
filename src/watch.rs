//! Poll-based watch mode.
//!
//! A cooperative single-threaded loop: every poll computes the maximum
//! modification time across tracked files under the original source
//! tree (the path the user pointed at, not the staged scratch copy)
//! and runs a full build cycle (re-stage, context, discovery, render,
//! publish) when it advances. Re-staging matters: each cycle must see
//! the edits that woke it up. Template files under the tree are
//! tracked through their extensions like any other file.
//!
//! Only local directory sources can be watched; a remote git URL has
//! no filesystem to poll.
//!
//! Ctrl-C exits the loop cleanly. Any other error during a rebuild is
//! logged and re-raised: an unknown failure mode while continuously
//! republishing is unsafe to mask.

use crate::build::run_build;
use crate::config::BuildConfig;
use crate::discover::RENDERABLE_EXTS;
use crate::log;
use crate::source::Source;
use anyhow::{Context, Result, bail};
use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, SystemTime},
};
use walkdir::WalkDir;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The tree the watcher polls: the configured root inside the original
/// source directory. Remote sources cannot be watched.
fn watch_root(config: &BuildConfig) -> Result<PathBuf> {
    match Source::from_uri(&config.uri) {
        Source::Snapshot { path } => Ok(path.join(&config.root_dir)),
        Source::Git { url } => {
            bail!("cannot watch {url}: watch mode needs a local source directory")
        }
    }
}

/// Latest modification time among tracked files under `root`, or
/// `None` when nothing tracked exists (treated by the loop as "no
/// change", not an error). Only `.`-prefixed directories are skipped:
/// underscore subtrees hold templates, and edits there should trigger
/// a rebuild too.
fn max_mtime(root: &Path) -> Option<SystemTime> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().is_dir()
                    && entry.file_name().to_str().is_some_and(|n| n.starts_with('.')))
        })
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| {
                        RENDERABLE_EXTS.contains(&ext.to_ascii_lowercase().as_str())
                    })
        })
        .filter_map(|entry| entry.metadata().ok()?.modified().ok())
        .max()
}

/// One poll step: rebuild from scratch when the tree advanced past
/// `last_seen`, and return the new high-water mark.
fn tick(
    config: &BuildConfig,
    root: &Path,
    last_seen: Option<SystemTime>,
) -> Result<Option<SystemTime>> {
    let latest = max_mtime(root);
    if latest > last_seen {
        log!("watch"; "change detected, re-rendering");
        match run_build(config.clone()) {
            Ok(report) if report.had_failures() => {
                log!("watch"; "{} documents skipped", report.failed.len());
            }
            Ok(_) => {}
            Err(err) => {
                log!("error"; "watch rebuild failed: {err:#}");
                return Err(err);
            }
        }
    }
    Ok(latest.max(last_seen))
}

/// Block until interrupted, running a fresh build cycle whenever the
/// source tree changes. Assumes the caller already ran the initial
/// build; the first poll baseline is the current state, so nothing
/// rebuilds until something actually changes.
pub fn watch(config: &BuildConfig) -> Result<()> {
    let root = watch_root(config)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("failed to install interrupt handler")?;

    log!("watch"; "watching {} (Ctrl-C to stop)", root.display());

    let mut last_seen = max_mtime(&root);
    loop {
        thread::sleep(POLL_INTERVAL);
        if interrupted.load(Ordering::SeqCst) {
            log!("watch"; "stopping");
            return Ok(());
        }
        last_seen = tick(config, &root, last_seen)?;
    }
}
