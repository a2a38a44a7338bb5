//! verdoc - versioned documentation generator.
//!
//! Renders a tree of Markdown/template documents to HTML, one output
//! subtree per git branch, tag, or directory snapshot, so any number
//! of versions of the same documentation set publish side by side.
//!
//! The pipeline: resolve the reference identity, stage the source
//! (clone+checkout or filtered copy), plan the directory layout,
//! build the template global context, discover renderable files,
//! render each through the markdown+template engine into a staging
//! area, then swap the staging tree into the live destination.

pub mod build;
pub mod cli;
pub mod config;
pub mod context;
pub mod discover;
pub mod layout;
pub mod logger;
pub mod refs;
pub mod render;
pub mod source;
pub mod utils;
pub mod watch;
