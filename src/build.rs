//! Build pipeline orchestration.
//!
//! One build is a single linear pass:
//!
//! ```text
//! resolve reference ─▶ stage source ─▶ plan layout
//!        ─▶ build context ─▶ discover ─▶ render into staging ─▶ publish
//! ```
//!
//! Everything up to and including layout planning happens once, in
//! [`Build::prepare`]; the remaining steps live in [`Build::run`],
//! which starts every cycle from a freshly reset staging tree so
//! repeated runs never merge with a previous cycle's output.
//!
//! Publishing is a two-phase swap: documents render into a scratch
//! staging tree, and only when the whole batch is done does the live
//! destination get replaced. A crash mid-render leaves the previous
//! build untouched.

use crate::config::BuildConfig;
use crate::context::build_globals;
use crate::discover::discover;
use crate::layout::Layout;
use crate::log;
use crate::logger::Level;
use crate::refs::RefIdentity;
use crate::render::{RenderFailure, Renderer};
use crate::source::{Source, Staged};
use crate::utils::fs::{copy_tree, remove_tree};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Outcome of one render/publish cycle.
///
/// Per-file failures are acceptable by policy: one broken page must
/// not block publishing the rest of the site, so they are carried
/// here instead of aborting the build.
#[derive(Debug)]
pub struct BuildReport {
    /// Live destination the batch was published to
    pub dest: PathBuf,
    /// Output paths relative to the destination, in render order
    pub rendered: Vec<PathBuf>,
    /// Documents skipped because of template or markup errors
    pub failed: Vec<RenderFailure>,
}

impl BuildReport {
    pub fn had_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// A prepared build: reference resolved, source staged and checked
/// out, directories planned. Staging is populated per [`Build::run`]
/// cycle, not here.
pub struct Build {
    config: BuildConfig,
    reference: RefIdentity,
    staged: Staged,
    layout: Layout,
    staging: TempDir,
}

impl Build {
    /// Run the fatal-on-failure front half of the pipeline. Any error
    /// here (clone, checkout, copy, layout) aborts the whole build
    /// with nothing published.
    pub fn prepare(config: BuildConfig) -> Result<Self> {
        let source = Source::from_uri(&config.uri);
        let reference = RefIdentity::resolve(
            config.branch.as_deref(),
            config.tag.as_deref(),
            source.is_git(),
            &config.uri,
        );
        log!("build"; "{} {} -> {}",
            reference.kind.as_str(), reference.value, config.dest_root.display());

        let staged = source.stage(&config.temp_dir)?;
        if reference.needs_checkout() {
            staged.checkout(&reference)?;
        }

        let layout = Layout::plan(&config, &staged.working_dir, &reference);
        let staging = tempfile::Builder::new()
            .prefix("verdoc-build-")
            .tempdir_in(&config.temp_dir)
            .context("failed to create build staging directory")?;

        log!(Level::Debug; "build"; "source: {}", layout.source_src.display());
        log!(Level::Debug; "build"; "templates: {}", layout.templates_src.display());
        log!(Level::Debug; "build"; "staging: {}", staging.path().display());
        log!(Level::Debug; "build"; "assets dest: {}", layout.assets_dest.display());

        Ok(Self {
            config,
            reference,
            staged,
            layout,
            staging,
        })
    }

    pub fn reference(&self) -> &RefIdentity {
        &self.reference
    }

    /// Documentation subtree inside the staged working directory.
    pub fn source_src(&self) -> &Path {
        &self.layout.source_src
    }

    /// Steps shared by one-shot builds and every watch cycle: reset
    /// staging, build the global context, discover, render the batch
    /// into staging, publish.
    pub fn run(&self) -> Result<BuildReport> {
        self.layout.prepare(self.staging.path())?;

        let branch = self.staged.branch_echo(&self.reference);
        let tag = self.staged.tag_echo(&self.reference);
        let globals = build_globals(
            &self.reference,
            &self.config.dest_root,
            &self.staged.working_dir,
            &branch,
            &tag,
            &self.config.base_template,
        );

        let files = discover(&self.layout.source_src);
        log!("render"; "rendering {} documents @ {}", files.len(), self.layout.dest.display());

        let renderer = Renderer::new(
            self.layout.templates_src.clone(),
            self.layout.source_src.clone(),
            globals,
        );

        let mut rendered = Vec::with_capacity(files.len());
        let mut failed = Vec::new();
        for path in &files {
            let rel = path
                .strip_prefix(&self.layout.source_src)
                .context("discovered file outside the source dir")?;
            log!(Level::Verbose; "render"; "{}", rel.display());
            match renderer.render_file(rel, self.staging.path()) {
                Ok(_) => rendered.push(rel.with_extension("html")),
                Err(failure) => {
                    log!("error"; "skipping {failure}");
                    failed.push(failure);
                }
            }
        }

        self.publish()?;
        log!("build"; "published {} documents ({} skipped)", rendered.len(), failed.len());

        Ok(BuildReport {
            dest: self.layout.dest.clone(),
            rendered,
            failed,
        })
    }

    /// Replace the live destination with the staging tree. The delete
    /// and the copy are the only moment the public path is in flux;
    /// nothing earlier in the cycle touches it.
    fn publish(&self) -> Result<()> {
        remove_tree(&self.layout.dest)?;
        copy_tree(self.staging.path(), &self.layout.dest)
            .with_context(|| format!("failed to publish to {}", self.layout.dest.display()))
    }
}

/// Prepare and run a one-shot build.
pub fn run_build(config: BuildConfig) -> Result<BuildReport> {
    Build::prepare(config)?.run()
}
