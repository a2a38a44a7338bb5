//! Template global context.
//!
//! The fixed set of variables injected into every rendered document.
//! Built once per build cycle, after staging and layout planning, and
//! passed by reference into every render call.
//!
//! | Key            | Value                                              |
//! |----------------|----------------------------------------------------|
//! | `URL_ROOT`     | `/<kind>/<value>`                                  |
//! | `GIT_REF_TYPE` | `branch`, `tag`, or `file`                         |
//! | `GIT_REF`      | normalized reference value                         |
//! | `ASSETS`       | `/<kind>/<value>/_static`                          |
//! | `ALL_GIT_REFS` | index of already-published sibling versions        |
//! | `PKG`          | parsed `package.json`, absent when missing         |
//! | `TAG`          | tag value, or empty string                         |
//! | `BRANCH`       | branch value, or empty string                      |
//! | `BASE_TEMPLATE`| configured base template name                      |

use crate::layout::ASSETS_DIR_NAME;
use crate::log;
use crate::refs::{self, RefIdentity};
use serde_json::{Map, Value, json};
use std::{fs, path::Path};

/// Assemble the global context. `repo_root` is the staged working
/// directory (where `package.json` may live); `dest_root` is scanned
/// for sibling versions.
pub fn build_globals(
    reference: &RefIdentity,
    dest_root: &Path,
    repo_root: &Path,
    branch: &str,
    tag: &str,
    base_template: &str,
) -> minijinja::Value {
    let url_root = format!("/{}/{}", reference.kind.as_str(), reference.value);

    let mut globals = Map::new();
    globals.insert("URL_ROOT".into(), json!(url_root));
    globals.insert("GIT_REF_TYPE".into(), json!(reference.kind.as_str()));
    globals.insert("GIT_REF".into(), json!(reference.value));
    globals.insert("ASSETS".into(), json!(format!("{url_root}/{ASSETS_DIR_NAME}")));
    globals.insert("ALL_GIT_REFS".into(), refs::list_refs(dest_root));
    if let Some(pkg) = parse_package_json(&repo_root.join("package.json")) {
        globals.insert("PKG".into(), pkg);
    }
    globals.insert("TAG".into(), json!(tag));
    globals.insert("BRANCH".into(), json!(branch));
    globals.insert("BASE_TEMPLATE".into(), json!(base_template));

    minijinja::Value::from_serialize(&Value::Object(globals))
}

/// Read package metadata. Missing file is the normal case for most
/// repositories; malformed JSON degrades the same way, with a warning.
fn parse_package_json(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            log!("warn"; "ignoring malformed {}: {err}", path.display());
            None
        }
    }
}
