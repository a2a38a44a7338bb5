//! Templated document rendering.
//!
//! Each discovered file goes through a two-stage pipeline:
//!
//! 1. `{% markdown %}...{% endmarkdown %}` regions are extracted and
//!    converted to HTML (tables, fenced code, heading attributes,
//!    footnotes, smart punctuation) before the template engine ever
//!    sees the text;
//! 2. the surrounding template resolves interpolation, includes and
//!    inheritance against the immutable global context.
//!
//! The preprocessor runs inside the template loader, so included and
//! extended files get their markdown regions expanded too. The loader
//! search path is the templates subtree first, then the documentation
//! source subtree, which lets templates include documents and
//! documents extend templates.
//!
//! Rendering one file is independent of every other file; a malformed
//! document is reported as a [`RenderFailure`] and never aborts the
//! batch.

use minijinja::{AutoEscape, Environment};
use pulldown_cmark::{Options, Parser, html};
use regex::Regex;
use std::{
    fs,
    path::{Component, Path, PathBuf},
    sync::OnceLock,
};

// ============================================================================
// Markdown conversion
// ============================================================================

/// Convert a Markdown fragment to HTML.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);

    let parser = Parser::new_ext(text, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn markdown_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\{%-?\s*markdown\s*-?%\}(.*?)\{%-?\s*endmarkdown\s*-?%\}")
            .expect("markdown block pattern is valid")
    })
}

/// Expand every markdown block in a template source, leaving the rest
/// of the text untouched. Template syntax produced by the conversion
/// (or written inside the block) is resolved by the engine afterwards.
pub fn expand_markdown_blocks(source: &str) -> String {
    markdown_block_re()
        .replace_all(source, |caps: &regex::Captures<'_>| {
            render_markdown(caps[1].trim_matches('\n')).trim().to_string()
        })
        .into_owned()
}

// ============================================================================
// Render engine
// ============================================================================

/// One skipped document. Carried in the build report so callers and
/// tests see failures as data, not just log lines.
#[derive(Debug, Clone)]
pub struct RenderFailure {
    /// Source file, relative to the documentation source dir
    pub file: String,
    /// 1-based line in the template, when the engine knows it
    pub line: Option<usize>,
    pub message: String,
}

impl std::fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}: {}", self.file, self.message),
            None => write!(f, "{}: {}", self.file, self.message),
        }
    }
}

pub struct Renderer {
    env: Environment<'static>,
    globals: minijinja::Value,
}

impl Renderer {
    /// Build an engine whose loader searches `templates_src` then
    /// `source_src`, applying markdown expansion to everything loaded.
    pub fn new(
        templates_src: PathBuf,
        source_src: PathBuf,
        globals: minijinja::Value,
    ) -> Self {
        let mut env = Environment::new();
        // site templates assume no escaping regardless of extension
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_loader(move |name| {
            if !is_safe_template_name(name) {
                return Ok(None);
            }
            for dir in [&templates_src, &source_src] {
                let path = dir.join(name);
                if path.is_file() {
                    let raw = fs::read_to_string(&path).map_err(|err| {
                        minijinja::Error::new(
                            minijinja::ErrorKind::InvalidOperation,
                            format!("failed to read {}: {err}", path.display()),
                        )
                    })?;
                    return Ok(Some(expand_markdown_blocks(&raw)));
                }
            }
            Ok(None)
        });
        Self { env, globals }
    }

    /// Render one document and write it under `out_root`, preserving
    /// the relative directory structure and forcing the `.html`
    /// extension. Returns the written path.
    pub fn render_file(&self, rel: &Path, out_root: &Path) -> Result<PathBuf, RenderFailure> {
        let name = template_name(rel);
        let fail = |err: &minijinja::Error| RenderFailure {
            file: name.clone(),
            line: err.line(),
            message: error_chain(err),
        };

        let template = self.env.get_template(&name).map_err(|err| fail(&err))?;
        let rendered = template.render(&self.globals).map_err(|err| fail(&err))?;

        let out_path = out_root.join(rel).with_extension("html");
        let write_fail = |err: std::io::Error| RenderFailure {
            file: name.clone(),
            line: None,
            message: format!("failed to write {}: {err}", out_path.display()),
        };
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(write_fail)?;
        }
        fs::write(&out_path, rendered.as_bytes()).map_err(write_fail)?;
        Ok(out_path)
    }
}

/// Flatten an error and its sources into one log-friendly line.
fn error_chain(err: &minijinja::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Template names are `/`-separated regardless of platform.
fn template_name(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Reject names that would escape the search path.
fn is_safe_template_name(name: &str) -> bool {
    !name.split('/').any(|part| part == ".." || part.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;
    use std::fs;
    use tempfile::TempDir;

    // ------------------------------------------------------------------
    // Markdown conversion
    // ------------------------------------------------------------------

    #[test]
    fn test_markdown_basics() {
        let html = render_markdown("# Title\n\nsome *text*");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn test_markdown_tables_and_fences() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));

        let html = render_markdown("```rust\nfn main() {}\n```");
        assert!(html.contains("<pre><code"));
    }

    #[test]
    fn test_markdown_heading_attributes() {
        let html = render_markdown("# Install {#install}");
        assert!(html.contains(r#"id="install""#));
    }

    #[test]
    fn test_markdown_smart_punctuation() {
        let html = render_markdown("it's \"quoted\"");
        assert!(html.contains('\u{2019}'));
        assert!(html.contains('\u{201c}'));
    }

    // ------------------------------------------------------------------
    // Block expansion
    // ------------------------------------------------------------------

    #[test]
    fn test_expand_single_block() {
        let out = expand_markdown_blocks("<div>{% markdown %}\n# Hi\n{% endmarkdown %}</div>");
        assert_eq!(out, "<div><h1>Hi</h1></div>");
    }

    #[test]
    fn test_block_tags_tolerate_newlines_and_tabs() {
        // tag-internal whitespace spans lines; the pattern (and its
        // engine features) must accept more than plain spaces
        let out = expand_markdown_blocks("{%\n\tmarkdown\n%}# Hi{%\n endmarkdown\t%}");
        assert_eq!(out, "<h1>Hi</h1>");
    }

    #[test]
    fn test_expand_multiple_blocks_and_surrounding_text() {
        let src = "a {% markdown %}*x*{% endmarkdown %} b {% markdown %}*y*{% endmarkdown %} c";
        let out = expand_markdown_blocks(src);
        assert!(out.starts_with("a <p><em>x</em></p>"));
        assert!(out.contains("b <p><em>y</em></p>"));
        assert!(out.ends_with(" c"));
    }

    #[test]
    fn test_template_syntax_survives_expansion() {
        let out = expand_markdown_blocks("{% markdown %}# {{ GIT_REF }}{% endmarkdown %}");
        assert!(out.contains("{{ GIT_REF }}"));
    }

    #[test]
    fn test_no_block_is_identity() {
        let src = "{% if x %}plain{% endif %}";
        assert_eq!(expand_markdown_blocks(src), src);
    }

    // ------------------------------------------------------------------
    // Render engine
    // ------------------------------------------------------------------

    fn renderer(dir: &TempDir) -> (Renderer, PathBuf) {
        let templates = dir.path().join("_templates");
        let source = dir.path().join("src");
        let out = dir.path().join("out");
        fs::create_dir_all(&templates).unwrap();
        fs::create_dir_all(&source).unwrap();
        let globals =
            minijinja::Value::from_serialize(context! { GIT_REF => "main", URL_ROOT => "/branch/main" });
        (Renderer::new(templates, source, globals), out)
    }

    #[test]
    fn test_render_writes_html_with_globals() {
        let dir = TempDir::new().unwrap();
        let (renderer, out) = renderer(&dir);
        fs::write(
            dir.path().join("src/page.md"),
            "{% markdown %}# Docs for {{ GIT_REF }}{% endmarkdown %}",
        )
        .unwrap();

        let written = renderer.render_file(Path::new("page.md"), &out).unwrap();
        assert_eq!(written, out.join("page.html"));
        let html = fs::read_to_string(written).unwrap();
        assert_eq!(html, "<h1>Docs for main</h1>");
    }

    #[test]
    fn test_render_preserves_nested_dirs() {
        let dir = TempDir::new().unwrap();
        let (renderer, out) = renderer(&dir);
        fs::create_dir_all(dir.path().join("src/guide")).unwrap();
        fs::write(dir.path().join("src/guide/intro.html"), "ok").unwrap();

        let written = renderer
            .render_file(Path::new("guide/intro.html"), &out)
            .unwrap();
        assert_eq!(written, out.join("guide/intro.html"));
    }

    #[test]
    fn test_document_extends_template() {
        let dir = TempDir::new().unwrap();
        let (renderer, out) = renderer(&dir);
        fs::write(
            dir.path().join("_templates/base.html"),
            "<body>{% block body %}{% endblock %}</body>",
        )
        .unwrap();
        fs::write(
            dir.path().join("src/page.html"),
            "{% extends \"base.html\" %}{% block body %}{{ URL_ROOT }}{% endblock %}",
        )
        .unwrap();

        let written = renderer.render_file(Path::new("page.html"), &out).unwrap();
        assert_eq!(
            fs::read_to_string(written).unwrap(),
            "<body>/branch/main</body>"
        );
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (renderer, out) = renderer(&dir);
        fs::write(dir.path().join("src/p.md"), "{% markdown %}*hey*{% endmarkdown %}").unwrap();

        let first = fs::read(renderer.render_file(Path::new("p.md"), &out).unwrap()).unwrap();
        let second = fs::read(renderer.render_file(Path::new("p.md"), &out).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_syntax_error_reports_file_and_line() {
        let dir = TempDir::new().unwrap();
        let (renderer, out) = renderer(&dir);
        fs::write(dir.path().join("src/bad.html"), "line one\n{% if %}").unwrap();

        let failure = renderer
            .render_file(Path::new("bad.html"), &out)
            .unwrap_err();
        assert_eq!(failure.file, "bad.html");
        assert_eq!(failure.line, Some(2));
        assert!(!out.join("bad.html").exists());
    }

    #[test]
    fn test_missing_include_is_a_failure_not_a_panic() {
        let dir = TempDir::new().unwrap();
        let (renderer, out) = renderer(&dir);
        fs::write(
            dir.path().join("src/page.html"),
            "{% include \"missing.html\" %}",
        )
        .unwrap();

        let failure = renderer
            .render_file(Path::new("page.html"), &out)
            .unwrap_err();
        assert!(failure.message.contains("missing.html"));
    }

    #[test]
    fn test_loader_rejects_escaping_names() {
        assert!(!is_safe_template_name("../secrets.html"));
        assert!(!is_safe_template_name("a//b.html"));
        assert!(is_safe_template_name("guide/intro.md"));
    }
}
