//! End-to-end pipeline tests against snapshot sources.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use verdoc::build::run_build;
use verdoc::cli::Cli;
use verdoc::config::BuildConfig;

use clap::Parser;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Source tree named `name` under `parent`, with a base template and
/// a couple of documents.
fn make_site(parent: &Path, name: &str) -> PathBuf {
    let root = parent.join(name);
    write(
        &root,
        "docs/_templates/base.html",
        "<html><head><link href=\"{{ ASSETS }}/site.css\"></head>\n\
         <body>{% block body %}{% endblock %}</body></html>",
    );
    write(
        &root,
        "docs/index.md",
        "{% extends \"base.html\" %}{% block body %}\n\
         {% markdown %}\n# {{ GIT_REF }} docs\n\nWelcome.\n{% endmarkdown %}\n\
         {% endblock %}",
    );
    write(&root, "docs/guide/install.md", "install at {{ URL_ROOT }}");
    write(&root, "docs/_static/site.css", "body { margin: 0 }");
    write(&root, "docs/_drafts/wip.md", "never rendered");
    root
}

fn config(source: &Path, dest_root: &Path, temp: &Path) -> BuildConfig {
    let cli = Cli::try_parse_from([
        "verdoc",
        "--temp-dir",
        temp.to_str().unwrap(),
        source.to_str().unwrap(),
        dest_root.to_str().unwrap(),
    ])
    .unwrap();
    BuildConfig::from_cli(&cli).unwrap()
}

#[test]
fn full_site_renders_through_cli_config() {
    let work = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let site = make_site(work.path(), "handbook");

    let report = run_build(config(&site, out.path(), work.path())).unwrap();
    assert!(!report.had_failures());

    let dest = out.path().join("file/handbook");
    let index = fs::read_to_string(dest.join("index.html")).unwrap();
    assert!(index.contains("<h1>handbook docs</h1>"));
    assert!(index.contains("/file/handbook/_static/site.css"));

    let guide = fs::read_to_string(dest.join("guide/install.html")).unwrap();
    assert_eq!(guide, "install at /file/handbook");

    assert!(dest.join("_static/site.css").is_file());
    assert!(!dest.join("_drafts").exists());
    // the base template is loadable, not published as a document
    assert!(!dest.join("_templates").exists());
}

#[test]
fn sibling_versions_publish_side_by_side() {
    let work = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let v1 = make_site(work.path(), "v1");
    let v2 = make_site(work.path(), "v2");

    run_build(config(&v1, out.path(), work.path())).unwrap();
    run_build(config(&v2, out.path(), work.path())).unwrap();

    assert!(out.path().join("file/v1/index.html").is_file());
    assert!(out.path().join("file/v2/index.html").is_file());

    // rebuilding v1 leaves v2 untouched
    let marker = out.path().join("file/v2/index.html");
    let before = fs::metadata(&marker).unwrap().modified().unwrap();
    run_build(config(&v1, out.path(), work.path())).unwrap();
    assert_eq!(fs::metadata(&marker).unwrap().modified().unwrap(), before);
}

#[test]
fn published_siblings_visible_to_later_builds() {
    let work = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let v1 = make_site(work.path(), "v1");
    let v2 = make_site(work.path(), "v2");
    write(
        &v2,
        "docs/versions.html",
        "{% for r in ALL_GIT_REFS.file.refs %}{{ r.ref_val }};{% endfor %}",
    );

    run_build(config(&v1, out.path(), work.path())).unwrap();
    let report = run_build(config(&v2, out.path(), work.path())).unwrap();
    assert!(!report.had_failures());

    let versions = fs::read_to_string(out.path().join("file/v2/versions.html")).unwrap();
    // v1 is already published; v2 itself is not, while it is being built
    assert_eq!(versions, "v1;");
}
