//! Template loading, rendering, and the inheritance protocol.
//!
//! A [`Registry`] owns one engine holding every template under the
//! templates directory, compiled eagerly under its root-relative name.
//! The engine's `tmpl(...)` function resolves names against a snapshot
//! frozen right after load, so templates can call each other no matter
//! which one compiled first.

pub mod context;
pub mod error;
pub mod functions;

use crate::frontmatter::{self, Metadata};
use crate::pagination::TypeCounts;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tera::Tera;
use walkdir::WalkDir;

pub use context::RenderContext;
pub use error::TemplateError;

#[derive(Debug)]
pub struct Registry {
    engine: Tera,
    metadata: BTreeMap<String, Metadata>,
}

impl Registry {
    /// Load every file under `root` as a template. Registered names are
    /// root-relative with forward slashes, whatever the platform. A
    /// metadata or syntax error in any file aborts the whole load.
    pub fn load(root: &Path, counts: Arc<TypeCounts>) -> Result<Self, TemplateError> {
        let snapshot = Arc::new(OnceLock::new());
        let mut engine = Tera::default();
        engine.autoescape_on(vec![]);
        functions::register(&mut engine, Some(Arc::clone(&snapshot)), counts);

        let mut metadata = BTreeMap::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                TemplateError::Io(path, err.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let name = template_name(root, path);
            let text = fs::read_to_string(path)
                .map_err(|err| TemplateError::Io(path.to_path_buf(), err))?;
            let (meta, body) = frontmatter::split(&text)
                .map_err(|err| TemplateError::Metadata(path.to_path_buf(), err))?;
            engine
                .add_raw_template(&name, body)
                .map_err(|err| TemplateError::Syntax(path.to_path_buf(), err))?;
            metadata.insert(name, meta);
        }

        // Freeze the view the `tmpl` closures resolve against. Set once
        // per registry, so the Err (already set) case cannot happen.
        snapshot.set(engine.clone()).ok();

        Ok(Self { engine, metadata })
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Metadata of a registered template.
    pub fn template_meta(&self, name: &str) -> Result<&Metadata, TemplateError> {
        self.metadata
            .get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_owned()))
    }

    /// Render one registered template against a context, without
    /// following its inheritance chain.
    pub fn render(&self, name: &str, ctx: &RenderContext) -> Result<String, TemplateError> {
        if !self.metadata.contains_key(name) {
            return Err(TemplateError::UnknownTemplate(name.to_owned()));
        }
        self.engine
            .render(name, &ctx.to_tera()?)
            .map_err(|source| TemplateError::Render {
                name: name.to_owned(),
                source,
            })
    }

    /// Compile a content body as a one-off template. It shares the
    /// registry's function library and can call `tmpl` and `pages`,
    /// but is never registered under a name others could resolve.
    pub fn compile_inline(&self, origin: &Path, source: &str) -> Result<InlineTemplate, TemplateError> {
        let name = origin.display().to_string();
        let mut engine = self.engine.clone();
        engine
            .add_raw_template(&name, source)
            .map_err(|err| TemplateError::Syntax(origin.to_path_buf(), err))?;
        Ok(InlineTemplate { engine, name })
    }

    /// Drive a render through its inheritance chain into `out`.
    ///
    /// Each hop renders the current template, then moves to the
    /// ancestor named by its `inherit` field with the ancestor's
    /// metadata merged into `Tmpl` (ancestor keys win) and the fresh
    /// render as `Content`. A template without an ancestor writes its
    /// render and ends the chain.
    pub fn execute_inherit<W: Write>(
        &self,
        name: &str,
        mut ctx: RenderContext,
        out: &mut W,
    ) -> Result<(), TemplateError> {
        let mut visited = vec![name.to_owned()];
        let mut current = name;
        loop {
            let rendered = self.render(current, &ctx)?;
            let Some(parent) = context::inherit(self.template_meta(current)?) else {
                return out
                    .write_all(rendered.as_bytes())
                    .map_err(|source| TemplateError::Write {
                        name: current.to_owned(),
                        source,
                    });
            };
            if visited.iter().any(|seen| seen == parent) {
                let mut chain = visited;
                chain.push(parent.to_owned());
                return Err(TemplateError::InheritanceCycle { chain });
            }
            let parent_meta = self.template_meta(parent)?;
            ctx.tmpl.merge_from(parent_meta);
            ctx.content = rendered;
            visited.push(parent.to_owned());
            current = parent;
        }
    }
}

#[derive(Debug)]
pub struct InlineTemplate {
    engine: Tera,
    name: String,
}

impl InlineTemplate {
    pub fn render(&self, ctx: &RenderContext) -> Result<String, TemplateError> {
        self.engine
            .render(&self.name, &ctx.to_tera()?)
            .map_err(|source| TemplateError::Render {
                name: self.name.clone(),
                source,
            })
    }
}

/// Render a metadata field pattern (a `sourceName` or `buildPath`) in
/// one shot. The engine is built fresh and thrown away, and `tmpl` is
/// left unresolvable on purpose: path patterns must not depend on a
/// template registry that may still be loading.
pub fn render_meta(
    source: &str,
    ctx: &RenderContext,
    counts: &Arc<TypeCounts>,
) -> Result<String, TemplateError> {
    let mut engine = Tera::default();
    engine.autoescape_on(vec![]);
    functions::register(&mut engine, None, Arc::clone(counts));
    engine
        .render_str(source, &ctx.to_tera()?)
        .map_err(|err| TemplateError::Render {
            name: source.to_owned(),
            source: err,
        })
}

fn template_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_template(dir: &TempDir, name: &str, text: &str) {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    fn counts() -> Arc<TypeCounts> {
        Arc::new(TypeCounts::with_counts(&[("post.html", 12)]))
    }

    fn load(dir: &TempDir) -> Registry {
        Registry::load(dir.path(), counts()).unwrap()
    }

    fn ctx(title: &str) -> RenderContext {
        RenderContext::new("post.html", title, Metadata::new())
    }

    #[test]
    fn test_load_registers_relative_names() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "index.html", "top");
        write_template(&dir, "partials/head.html", "head");

        let registry = load(&dir);
        assert_eq!(registry.len(), 2);
        assert!(registry.template_meta("index.html").is_ok());
        assert!(registry.template_meta("partials/head.html").is_ok());
    }

    #[test]
    fn test_load_splits_template_metadata() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "page.html", "inherit: index.html\n+++++\n{{ Content }}");

        let registry = load(&dir);
        let meta = registry.template_meta("page.html").unwrap();
        assert_eq!(meta.get_str("inherit"), Some("index.html"));
    }

    #[test]
    fn test_load_rejects_template_syntax_errors() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "broken.html", "{{ unclosed");

        let err = Registry::load(dir.path(), counts()).unwrap_err();
        assert!(matches!(err, TemplateError::Syntax(ref path, _) if path.ends_with("broken.html")));
    }

    #[test]
    fn test_load_rejects_bad_metadata() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "broken.html", "- a\n- b\n+++++\nbody");

        let err = Registry::load(dir.path(), counts()).unwrap_err();
        assert!(matches!(err, TemplateError::Metadata(ref path, _) if path.ends_with("broken.html")));
    }

    #[test]
    fn test_render_uses_context_fields() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "index.html", "Hello {{ Title }}");

        let out = load(&dir).render("index.html", &ctx("World")).unwrap();
        assert_eq!(out, "Hello World");
    }

    #[test]
    fn test_render_unknown_template() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "index.html", "x");

        let err = load(&dir).render("ghost.html", &ctx("")).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownTemplate(name) if name == "ghost.html"));
    }

    #[test]
    fn test_render_does_not_escape_html_content() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "index.html", "X{{ Content }}Y");

        let mut context = ctx("");
        context.content = "<b>hi</b>".to_owned();
        let out = load(&dir).render("index.html", &context).unwrap();
        assert_eq!(out, "X<b>hi</b>Y");
    }

    #[test]
    fn test_tmpl_function_renders_sibling() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "a.html", "A[{{ tmpl(name='b.html') }}]");
        write_template(&dir, "b.html", "B");

        let out = load(&dir).render("a.html", &ctx("")).unwrap();
        assert_eq!(out, "A[B]");
    }

    #[test]
    fn test_tmpl_function_passes_data() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "a.html", "{{ tmpl(name='b.html', data=Meta) }}");
        write_template(&dir, "b.html", "hi {{ author }}");

        let (meta, _) = frontmatter::split("author: ada\n+++++\n").unwrap();
        let context = ctx("").with_meta(meta);
        let out = load(&dir).render("a.html", &context).unwrap();
        assert_eq!(out, "hi ada");
    }

    #[test]
    fn test_tmpl_function_unknown_name() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "a.html", "{{ tmpl(name='ghost.html') }}");

        let err = load(&dir).render("a.html", &ctx("")).unwrap_err();
        let mut chain = String::new();
        let mut source: Option<&dyn std::error::Error> = Some(&err);
        while let Some(err) = source {
            chain.push_str(&err.to_string());
            source = err.source();
        }
        assert!(chain.contains("unknown template"), "chain: {chain}");
    }

    #[test]
    fn test_execute_inherit_terminal_writes_render() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "index.html", "[{{ Title }}]");

        let mut out = Vec::new();
        load(&dir)
            .execute_inherit("index.html", ctx("Home"), &mut out)
            .unwrap();
        assert_eq!(out, b"[Home]");
    }

    #[test]
    fn test_execute_inherit_merges_ancestor_metadata() {
        let dir = TempDir::new().unwrap();
        write_template(
            &dir,
            "parent.html",
            "shared: parent\nparentOnly: p\n+++++\nparent:{{ Tmpl.shared }}:{{ Tmpl.parentOnly }}:{{ Tmpl.childOnly }}|{{ Content }}",
        );
        write_template(
            &dir,
            "child.html",
            "inherit: parent.html\nshared: child\nchildOnly: c\n+++++\nchild:{{ Tmpl.shared }}",
        );

        let registry = load(&dir);
        let child_meta = registry.template_meta("child.html").unwrap().clone();
        let context = RenderContext::new("child.html", "", child_meta);

        let mut out = Vec::new();
        registry
            .execute_inherit("child.html", context, &mut out)
            .unwrap();

        // The child renders with its own metadata. The parent then sees
        // the merge, its own keys winning, and the child's render as
        // Content.
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "parent:parent:p:c|child:child"
        );
    }

    #[test]
    fn test_execute_inherit_three_levels() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "base.html", "<{{ Content }}>");
        write_template(&dir, "mid.html", "inherit: base.html\n+++++\nM({{ Content }})");
        write_template(&dir, "leaf.html", "inherit: mid.html\n+++++\nL");

        let mut out = Vec::new();
        load(&dir)
            .execute_inherit("leaf.html", ctx(""), &mut out)
            .unwrap();
        assert_eq!(out, b"<M(L)>");
    }

    #[test]
    fn test_execute_inherit_unknown_ancestor() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "a.html", "inherit: ghost.html\n+++++\nbody");

        let mut out = Vec::new();
        let err = load(&dir)
            .execute_inherit("a.html", ctx(""), &mut out)
            .unwrap_err();
        assert!(matches!(err, TemplateError::UnknownTemplate(name) if name == "ghost.html"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_execute_inherit_reports_cycles() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "a.html", "inherit: b.html\n+++++\na");
        write_template(&dir, "b.html", "inherit: a.html\n+++++\nb");

        let mut out = Vec::new();
        let err = load(&dir)
            .execute_inherit("a.html", ctx(""), &mut out)
            .unwrap_err();
        match err {
            TemplateError::InheritanceCycle { chain } => {
                assert_eq!(chain, vec!["a.html", "b.html", "a.html"]);
            }
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn test_execute_inherit_self_cycle() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "a.html", "inherit: a.html\n+++++\na");

        let mut out = Vec::new();
        let err = load(&dir)
            .execute_inherit("a.html", ctx(""), &mut out)
            .unwrap_err();
        assert!(matches!(err, TemplateError::InheritanceCycle { .. }));
    }

    #[test]
    fn test_execute_inherit_non_string_inherit_is_terminal() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "a.html", "inherit: 5\n+++++\ndone");

        let mut out = Vec::new();
        load(&dir).execute_inherit("a.html", ctx(""), &mut out).unwrap();
        assert_eq!(out, b"done");
    }

    #[test]
    fn test_compile_inline_uses_registry_functions() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "b.html", "B");

        let registry = load(&dir);
        let inline = registry
            .compile_inline(Path::new("content/x.md"), "{{ tmpl(name='b.html') }}/{{ Title }}")
            .unwrap();
        assert_eq!(inline.render(&ctx("t")).unwrap(), "B/t");
    }

    #[test]
    fn test_compile_inline_rejects_bad_syntax() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "b.html", "B");

        let err = load(&dir)
            .compile_inline(Path::new("content/x.md"), "{% endfor %}")
            .unwrap_err();
        assert!(matches!(err, TemplateError::Syntax(ref path, _) if path.ends_with("x.md")));
    }

    #[test]
    fn test_render_meta_patterns() {
        let context = ctx("Hello World");
        assert_eq!(
            render_meta(context::DEFAULT_SOURCE_NAME, &context, &counts()).unwrap(),
            "hello-world.md"
        );
        assert_eq!(
            render_meta(context::DEFAULT_BUILD_PATH, &context, &counts()).unwrap(),
            "hello-world/index.html"
        );
    }

    #[test]
    fn test_render_meta_refuses_tmpl_calls() {
        let err = render_meta("{{ tmpl(name='a.html') }}", &ctx(""), &counts()).unwrap_err();
        let mut chain = String::new();
        let mut source: Option<&dyn std::error::Error> = Some(&err);
        while let Some(err) = source {
            chain.push_str(&err.to_string());
            source = err.source();
        }
        assert!(chain.contains("unavailable in this context"), "chain: {chain}");
    }

    #[test]
    fn test_render_meta_can_count_pages() {
        let out = render_meta(
            "{{ pages(type='post.html', per=5) }}",
            &ctx(""),
            &counts(),
        )
        .unwrap();
        assert_eq!(out, "3");
    }
}
