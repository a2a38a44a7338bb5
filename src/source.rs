//! Source staging.
//!
//! Materializes the requested source into a scratch working directory:
//! a `git clone` (plus checkout of the resolved reference) for remote
//! URIs, or a filtered recursive copy for plain directories. The rest
//! of the pipeline only sees the resulting working dir and whether git
//! operations apply to it.
//!
//! All staging failures are fatal: a build running against the wrong
//! checkout would silently publish the wrong version.

use crate::log;
use crate::logger::Level;
use crate::refs::{RefIdentity, RefKind};
use crate::utils::fs::copy_tree_filtered;
use anyhow::{Context, Result};
use std::{
    path::{Path, PathBuf},
    process::Command,
};
use tempfile::TempDir;
use thiserror::Error;

/// Directory names never carried into a staged snapshot.
const EXCLUDED_DIRS: &[&str] = &[".git", ".hg", ".svn", "node_modules"];

/// Staging errors, all fatal to the build.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("source path not found: {0}")]
    MissingSource(PathBuf),

    #[error("`git clone {url}` failed: {stderr}")]
    Clone { url: String, stderr: String },

    #[error("`git checkout` of {kind} `{reference}` failed: {stderr}")]
    Checkout {
        kind: &'static str,
        reference: String,
        stderr: String,
    },

    #[error("failed to run git")]
    Spawn(#[from] std::io::Error),
}

/// Normalize a source URI to canonical form:
///
/// * `"owner/name"` shorthand -> `"http://github.com/owner/name"`
/// * an already-schemed URL is returned unchanged
/// * anything else is a filesystem path, `~`-expanded and prefixed
///   with `file://`
pub fn normalize_uri(uri: &str) -> String {
    let uri = uri.trim();
    if uri.contains("://") {
        return uri.to_string();
    }
    if uri.split('/').count() == 2 && !uri.starts_with(['/', '.', '~']) {
        return format!("http://github.com/{uri}");
    }
    format!("file://{}", shellexpand::tilde(uri))
}

/// Where the source comes from, decided by URI shape alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Clone target; checkout applies.
    Git { url: String },
    /// Plain directory; checkout is never called for this variant.
    Snapshot { path: PathBuf },
}

/// A materialized working directory. Scratch space is removed when
/// this is dropped, after the build has published.
#[derive(Debug)]
pub struct Staged {
    pub working_dir: PathBuf,
    pub git_repo: bool,
    _scratch: TempDir,
}

impl Source {
    pub fn from_uri(uri: &str) -> Self {
        let normalized = normalize_uri(uri);
        match normalized.strip_prefix("file://") {
            Some(path) => Source::Snapshot {
                path: PathBuf::from(path),
            },
            None => Source::Git { url: normalized },
        }
    }

    pub const fn is_git(&self) -> bool {
        matches!(self, Source::Git { .. })
    }

    /// Materialize the source under `temp_parent`.
    pub fn stage(&self, temp_parent: &Path) -> Result<Staged> {
        let scratch = tempfile::Builder::new()
            .prefix("verdoc-")
            .tempdir_in(temp_parent)
            .context("failed to create staging directory")?;

        match self {
            Source::Snapshot { path } => {
                if !path.is_dir() {
                    return Err(StageError::MissingSource(path.clone()).into());
                }
                log!(Level::Verbose; "stage"; "copying {}", path.display());
                copy_tree_filtered(path, scratch.path(), EXCLUDED_DIRS)
                    .with_context(|| format!("failed to copy source tree {}", path.display()))?;
                Ok(Staged {
                    working_dir: scratch.path().to_path_buf(),
                    git_repo: false,
                    _scratch: scratch,
                })
            }
            Source::Git { url } => {
                log!(Level::Verbose; "stage"; "cloning {url}");
                let dest = scratch.path().to_str().context("non-UTF-8 temp path")?;
                let output = git(None, &["clone", url, dest])?;
                if !output.status.success() {
                    return Err(StageError::Clone {
                        url: url.clone(),
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    }
                    .into());
                }
                Ok(Staged {
                    working_dir: scratch.path().to_path_buf(),
                    git_repo: true,
                    _scratch: scratch,
                })
            }
        }
    }
}

impl Staged {
    /// Check out the resolved reference inside the working directory.
    /// Only meaningful for git-backed sources; the caller gates on
    /// [`RefIdentity::needs_checkout`].
    pub fn checkout(&self, reference: &RefIdentity) -> Result<()> {
        debug_assert!(self.git_repo);
        log!(Level::Verbose; "stage"; "checkout {} {}", reference.kind.as_str(), reference.raw);
        let output = git(Some(&self.working_dir), &["checkout", &reference.raw])?;
        if !output.status.success() {
            return Err(StageError::Checkout {
                kind: reference.kind.as_str(),
                reference: reference.raw.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
            .into());
        }
        Ok(())
    }

    /// Name of the currently checked-out branch, if the working dir is
    /// a git repo and git can tell us.
    pub fn current_branch(&self) -> Option<String> {
        self.git_query(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Most recent tag reachable from the checkout, if any.
    pub fn latest_tag(&self) -> Option<String> {
        self.git_query(&["describe", "--tags", "--abbrev=0"])
    }

    fn git_query(&self, args: &[&str]) -> Option<String> {
        if !self.git_repo {
            return None;
        }
        let output = git(Some(&self.working_dir), args).ok()?;
        if !output.status.success() {
            return None;
        }
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!value.is_empty()).then_some(value)
    }

    /// Echo value for the `BRANCH` template global. Always the raw
    /// branch name; path normalization only applies on disk.
    pub fn branch_echo(&self, reference: &RefIdentity) -> String {
        match reference.kind {
            RefKind::Branch => reference.raw.clone(),
            _ if self.git_repo => self.current_branch().unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// Echo value for the `TAG` template global. Always the raw tag
    /// name; path normalization only applies on disk.
    pub fn tag_echo(&self, reference: &RefIdentity) -> String {
        match reference.kind {
            RefKind::Tag => reference.raw.clone(),
            _ if self.git_repo => self.latest_tag().unwrap_or_default(),
            _ => String::new(),
        }
    }
}

fn git(cwd: Option<&Path>, args: &[&str]) -> Result<std::process::Output, StageError> {
    log!(Level::Debug; "stage"; "git {}", args.join(" "));
    let mut cmd = Command::new("git");
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    Ok(cmd.args(args).output()?)
}
