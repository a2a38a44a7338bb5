//! Reference identity resolution.
//!
//! A build targets exactly one reference: a git branch, a git tag, or an
//! ad-hoc snapshot of a plain directory. The resolved identity namespaces
//! the destination (`dest_root/<kind>/<value>/`) so any number of
//! references publish side by side.

use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Which kind of source reference a build targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Branch,
    Tag,
    /// A plain directory snapshot, no version control involved.
    File,
}

impl RefKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RefKind::Branch => "branch",
            RefKind::Tag => "tag",
            RefKind::File => "file",
        }
    }
}

/// The (kind, value) pair identifying the version being built.
///
/// Decided once at resolution and immutable for the life of a build.
/// `value` is filesystem-safe: any `/` has been normalized to `_`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefIdentity {
    pub kind: RefKind,
    /// Normalized on-disk value
    pub value: String,
    /// Value as given, used for the actual git checkout
    pub raw: String,
}

impl RefIdentity {
    /// Decide the reference identity. Priority order: branch, then tag,
    /// both gated on the source being git-backed; anything else is a
    /// file snapshot named after the URI basename. Exactly one rule
    /// fires; there is no error case.
    pub fn resolve(
        branch: Option<&str>,
        tag: Option<&str>,
        git_repo: bool,
        uri: &str,
    ) -> Self {
        let (kind, raw) = match (branch, tag, git_repo) {
            (Some(branch), _, true) => (RefKind::Branch, branch.to_string()),
            (_, Some(tag), true) => (RefKind::Tag, tag.to_string()),
            _ => (RefKind::File, uri_basename(uri)),
        };
        Self {
            kind,
            value: normalize_value(&raw),
            raw,
        }
    }

    /// Whether the stager must check this reference out after staging.
    pub const fn needs_checkout(&self) -> bool {
        matches!(self.kind, RefKind::Branch | RefKind::Tag)
    }
}

/// Replace every `/` with `_` so the value is usable as one path
/// component. Idempotent.
pub fn normalize_value(value: &str) -> String {
    value.replace('/', "_")
}

fn uri_basename(uri: &str) -> String {
    uri.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(uri)
        .to_string()
}

/// Index of sibling versions already published under `dest_root`,
/// keyed by kind then value:
///
/// ```json
/// { "branch": { "path": "...", "refs": [ { "ref_val": "main", "path": "..." } ] } }
/// ```
///
/// Only completed, published builds appear; the in-progress one does
/// not, since it has not been swapped into place yet. A missing or
/// empty root yields an empty index, not an error.
pub fn list_refs(dest_root: &Path) -> Value {
    let mut index: BTreeMap<String, Value> = BTreeMap::new();
    let Ok(entries) = fs::read_dir(dest_root) else {
        return Value::Object(Map::new());
    };

    let mut kinds: Vec<_> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .collect();
    kinds.sort_by_key(|e| e.file_name());

    for kind in kinds {
        let kind_path = kind.path();
        let mut refs: Vec<Value> = Vec::new();
        if let Ok(values) = fs::read_dir(&kind_path) {
            let mut values: Vec<_> = values
                .filter_map(Result::ok)
                .filter(|e| e.path().is_dir())
                .collect();
            values.sort_by_key(|e| e.file_name());
            for value in values {
                refs.push(json!({
                    "ref_val": value.file_name().to_string_lossy(),
                    "path": value.path().to_string_lossy(),
                }));
            }
        }
        index.insert(
            kind.file_name().to_string_lossy().into_owned(),
            json!({ "path": kind_path.to_string_lossy(), "refs": refs }),
        );
    }

    Value::Object(index.into_iter().collect())
}
