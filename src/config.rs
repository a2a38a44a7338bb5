//! Build configuration.
//!
//! Every recognized option lives in [`BuildConfig`], with its default,
//! validated once at construction. Options arrive from two places: an
//! optional TOML file (`-c`) and CLI flags, with CLI taking precedence.
//! Unknown keys in the file are a configuration error, not silently
//! ignored.
//!
//! # Example
//!
//! ```toml
//! root_dir = "docs"
//! assets_dir = "docs/_static"
//! templates_dir = "docs/_templates"
//! base_template = "base.html"
//! ```

use crate::cli::Cli;
use anyhow::Result;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Shape of the optional TOML config file. Every field mirrors a CLI
/// flag; the flag wins when both are present.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    root_dir: Option<PathBuf>,
    source_dir: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
    templates_dir: Option<PathBuf>,
    temp_dir: Option<PathBuf>,
    base_template: Option<String>,
    branch: Option<String>,
    tag: Option<String>,
}

impl FileConfig {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Ok(toml::from_str(&content)?)
    }
}

/// The fully resolved build configuration.
///
/// `dest_root` and `temp_dir` are absolute; the `*_dir` fields stay
/// relative to the staged working directory (which does not exist yet
/// at construction time) and are made absolute by the layout planner.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Raw source URI as given on the command line
    pub uri: String,
    /// Destination root holding one subtree per published reference
    pub dest_root: PathBuf,
    /// Root directory of the documentation inside the staged tree
    pub root_dir: PathBuf,
    /// Markup source directory, default: the root directory itself
    pub source_dir: PathBuf,
    /// Static asset directory, default: `<root>/_static`
    pub assets_dir: PathBuf,
    /// Template directory, default: `<root>/_templates`
    pub templates_dir: PathBuf,
    /// Parent directory for scratch space, default: the system temp dir
    pub temp_dir: PathBuf,
    /// Base template name exposed to documents
    pub base_template: String,
    /// Requested git branch, if any
    pub branch: Option<String>,
    /// Requested git tag, if any
    pub tag: Option<String>,
    /// Re-render on change
    pub watch: bool,
}

impl BuildConfig {
    /// Merge CLI flags over the optional config file and validate.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };

        let root_dir = cli
            .root_dir
            .clone()
            .or(file.root_dir)
            .unwrap_or_else(|| PathBuf::from("docs"));
        let source_dir = cli
            .source_dir
            .clone()
            .or(file.source_dir)
            .unwrap_or_else(|| root_dir.clone());
        let assets_dir = cli
            .assets_dir
            .clone()
            .or(file.assets_dir)
            .unwrap_or_else(|| root_dir.join("_static"));
        let templates_dir = cli
            .templates_dir
            .clone()
            .or(file.templates_dir)
            .unwrap_or_else(|| root_dir.join("_templates"));
        let temp_dir = cli
            .temp_dir
            .clone()
            .or(file.temp_dir)
            .unwrap_or_else(env::temp_dir);

        let config = Self {
            uri: cli.uri.clone(),
            dest_root: absolutize(&expand_tilde(&cli.destination)),
            root_dir,
            source_dir,
            assets_dir,
            templates_dir,
            temp_dir: absolutize(&expand_tilde(&temp_dir)),
            base_template: cli
                .base_template
                .clone()
                .or(file.base_template)
                .unwrap_or_else(|| "base.html".to_string()),
            branch: cli.branch.clone().or(file.branch),
            tag: cli.tag.clone().or(file.tag),
            watch: cli.watch,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.uri.trim().is_empty() {
            return Err(ConfigError::Validation("source URI is empty".into()));
        }
        if !self.temp_dir.is_dir() {
            return Err(ConfigError::Validation(format!(
                "temp dir not found: {}",
                self.temp_dir.display()
            )));
        }
        for (name, dir) in [
            ("root-dir", &self.root_dir),
            ("source-dir", &self.source_dir),
            ("assets-dir", &self.assets_dir),
            ("templates-dir", &self.templates_dir),
        ] {
            if dir.is_absolute() {
                return Err(ConfigError::Validation(format!(
                    "{name} must be relative to the staged tree: {}",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// Expand a leading `~` in a path.
fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

/// Make a path absolute without requiring it to exist.
fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
