//! Recursive directory copy helpers.

use anyhow::{Context, Result};
use std::{ffi::OsStr, fs, path::Path};
use walkdir::WalkDir;

/// Copy `src` into `dest` recursively. `dest` is created if missing;
/// existing files are overwritten.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    copy_tree_filtered(src, dest, &[])
}

/// Copy `src` into `dest` recursively, skipping any directory whose
/// name appears in `excluded_dirs` (at any depth).
pub fn copy_tree_filtered(src: &Path, dest: &Path, excluded_dirs: &[&str]) -> Result<()> {
    let walker = WalkDir::new(src).into_iter().filter_entry(|entry| {
        !(entry.file_type().is_dir() && is_excluded(entry.file_name(), excluded_dirs))
    });

    for entry in walker {
        let entry = entry.context("failed to walk source tree")?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walked path is under its own root");
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("failed to copy to {}", target.display()))?;
        }
    }
    Ok(())
}

fn is_excluded(name: &OsStr, excluded_dirs: &[&str]) -> bool {
    name.to_str()
        .is_some_and(|name| excluded_dirs.contains(&name))
}

/// Remove a directory tree, treating "already gone" as success.
pub fn remove_tree(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("failed to remove {}", path.display()))
        }
    }
}
