//! Renderable source file discovery.
//!
//! Walks the documentation source tree collecting files the render
//! engine can process. Hidden (`.`) and partial (`_`) entries are
//! skipped at every level, so templates and assets living in
//! `_templates`/`_static` subtrees of the source dir never get
//! rendered as documents.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions the render engine accepts.
pub const RENDERABLE_EXTS: &[&str] = &["md", "jmd", "markdown", "html"];

fn is_hidden_or_partial(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

fn is_renderable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| RENDERABLE_EXTS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Enumerate renderable files under `source_src`, sorted for
/// deterministic render order. A missing or empty source directory
/// yields an empty set, which is valid: zero files to render.
pub fn discover(source_src: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(source_src)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !is_hidden_or_partial(name))
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_renderable(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}
