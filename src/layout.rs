//! Directory layout planning.
//!
//! Turns the configured relative directories and the resolved reference
//! into absolute paths: the three source subtrees under the staged
//! working directory, and the versioned destination under the
//! destination root.
//!
//! ```text
//! <working_dir>/<root>            <dest_root>/<kind>/<value>/
//!   ├── <source_dir>    ──render──▶  ├── *.html
//!   ├── <assets_dir>    ──copy────▶  ├── _static/
//!   └── <templates_dir>             (one subtree per published reference)
//! ```

use crate::config::BuildConfig;
use crate::log;
use crate::logger::Level;
use crate::refs::RefIdentity;
use crate::utils::fs::{copy_tree, remove_tree};
use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

/// Name of the public asset subdirectory inside each published build.
pub const ASSETS_DIR_NAME: &str = "_static";

/// All absolute paths one build touches.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Markup sources, under the working dir
    pub source_src: PathBuf,
    /// Static assets, under the working dir
    pub assets_src: PathBuf,
    /// Templates, under the working dir
    pub templates_src: PathBuf,
    /// Versioned destination: `dest_root/<kind>/<value>`
    pub dest: PathBuf,
    /// Public asset subtree: `dest/_static`
    pub assets_dest: PathBuf,
}

impl Layout {
    /// Compute the layout. Pure; no filesystem access. The reference
    /// value has already been made path-safe by the resolver, so no
    /// re-validation happens here.
    pub fn plan(config: &BuildConfig, working_dir: &Path, reference: &RefIdentity) -> Self {
        let dest = config
            .dest_root
            .join(reference.kind.as_str())
            .join(&reference.value);
        Self {
            source_src: working_dir.join(&config.source_dir),
            assets_src: working_dir.join(&config.assets_dir),
            templates_src: working_dir.join(&config.templates_dir),
            assets_dest: dest.join(ASSETS_DIR_NAME),
            dest,
        }
    }

    /// Reset the staging tree for one render cycle and copy assets
    /// into it.
    ///
    /// Staging always starts empty so a publish carries exactly what
    /// the current cycle produced, never leftovers from a previous
    /// one. The live destination is untouched here; only the publish
    /// step replaces it. Assets never go directly to the live
    /// destination either, so a half-copied asset tree is never
    /// public.
    ///
    /// A missing asset directory is advisory, not an error.
    pub fn prepare(&self, staging: &Path) -> Result<()> {
        log!(Level::Debug; "layout"; "resetting {}", staging.display());
        remove_tree(staging)?;
        fs::create_dir_all(staging)
            .with_context(|| format!("failed to create {}", staging.display()))?;

        if self.assets_src.is_dir() {
            let staged_assets = staging.join(ASSETS_DIR_NAME);
            log!(Level::Debug; "layout"; "assets -> {}", staged_assets.display());
            copy_tree(&self.assets_src, &staged_assets)?;
        } else {
            log!(Level::Verbose; "layout"; "no asset directory at {}", self.assets_src.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refs::RefKind;
    use tempfile::TempDir;

    fn config(dest_root: &Path) -> BuildConfig {
        BuildConfig {
            uri: "o/r".into(),
            dest_root: dest_root.to_path_buf(),
            root_dir: "docs".into(),
            source_dir: "docs".into(),
            assets_dir: PathBuf::from("docs/_static"),
            templates_dir: PathBuf::from("docs/_templates"),
            temp_dir: std::env::temp_dir(),
            base_template: "base.html".into(),
            branch: None,
            tag: None,
            watch: false,
        }
    }

    fn reference(kind: RefKind, value: &str) -> RefIdentity {
        RefIdentity {
            kind,
            value: value.into(),
            raw: value.into(),
        }
    }

    #[test]
    fn test_plan_paths() {
        let layout = Layout::plan(
            &config(Path::new("/out")),
            Path::new("/work"),
            &reference(RefKind::Branch, "feature_x"),
        );
        assert_eq!(layout.source_src, PathBuf::from("/work/docs"));
        assert_eq!(layout.assets_src, PathBuf::from("/work/docs/_static"));
        assert_eq!(layout.templates_src, PathBuf::from("/work/docs/_templates"));
        assert_eq!(layout.dest, PathBuf::from("/out/branch/feature_x"));
        assert_eq!(layout.assets_dest, PathBuf::from("/out/branch/feature_x/_static"));
    }

    #[test]
    fn test_prepare_resets_stale_staging_and_leaves_dest_alone() {
        let out = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        fs::write(staging.path().join("stale.html"), "previous cycle").unwrap();

        let live = out.path().join("branch/main");
        fs::create_dir_all(&live).unwrap();
        fs::write(live.join("index.html"), "still published").unwrap();

        let layout = Layout::plan(
            &config(out.path()),
            work.path(),
            &reference(RefKind::Branch, "main"),
        );
        layout.prepare(staging.path()).unwrap();

        assert!(staging.path().is_dir());
        assert!(!staging.path().join("stale.html").exists());
        assert!(live.join("index.html").exists());
    }

    #[test]
    fn test_prepare_copies_assets_into_staging_not_dest() {
        let out = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        fs::create_dir_all(work.path().join("docs/_static/css")).unwrap();
        fs::write(work.path().join("docs/_static/css/site.css"), "body{}").unwrap();

        let layout = Layout::plan(
            &config(out.path()),
            work.path(),
            &reference(RefKind::Branch, "main"),
        );
        layout.prepare(staging.path()).unwrap();

        assert!(staging.path().join("_static/css/site.css").is_file());
        assert!(!layout.assets_dest.exists());
    }

    #[test]
    fn test_prepare_missing_assets_is_advisory() {
        let out = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();

        let layout = Layout::plan(
            &config(out.path()),
            work.path(),
            &reference(RefKind::File, "proj"),
        );
        assert!(layout.prepare(staging.path()).is_ok());
        assert!(!staging.path().join(ASSETS_DIR_NAME).exists());
    }
}
