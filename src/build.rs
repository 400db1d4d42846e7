//! Site building orchestration.
//!
//! Loads the template registry once, then renders content and copies
//! static files in parallel. Every content file produces one output
//! file per page window, each pushed through its template's
//! inheritance chain.

use crate::frontmatter;
use crate::log;
use crate::pagination::TypeCounts;
use crate::project::Project;
use crate::template::{self, Registry, RenderContext, context};
use anyhow::{Context, Result, anyhow, bail};
use rayon::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

/// Build the whole site into `output`, relative to the project root.
pub fn build_site(project: &Project, output: &str) -> Result<()> {
    let output_dir = project.output_dir(output);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let counts = Arc::new(TypeCounts::new(project.content_dir()));
    let registry = Registry::load(&project.templates_dir(), Arc::clone(&counts))
        .context("failed to load templates")?;
    log!("templates"; "loaded {}", registry.len());

    let content_files = collect_files(&project.content_dir());
    log!("content"; "found {} files", content_files.len());

    let has_error = AtomicBool::new(false);

    let (content_result, static_result) = rayon::join(
        || {
            content_files.par_iter().try_for_each(|path| {
                if has_error.load(Ordering::Relaxed) {
                    return Err(anyhow!("Aborted"));
                }
                if let Err(e) = build_content_file(path, &output_dir, &registry, &counts) {
                    if !has_error.swap(true, Ordering::Relaxed) {
                        log!("error"; "{}: {:#}", path.display(), e);
                    }
                    return Err(anyhow!("Build failed"));
                }
                Ok(())
            })
        },
        || copy_static(&project.static_dir(), &output_dir, &has_error),
    );

    content_result?;
    static_result?;

    log_build_result(&output_dir)?;
    Ok(())
}

/// Render one content file into the output tree.
///
/// The body compiles as a template sharing the registry's function
/// library, renders once per page window, and its output rides through
/// the inheritance chain as `Content`. The output location comes from
/// rendering the layered `buildPath` pattern against the same window.
fn build_content_file(
    path: &Path,
    output_dir: &Path,
    registry: &Registry,
    counts: &Arc<TypeCounts>,
) -> Result<()> {
    let text = fs::read_to_string(path)?;
    let (meta, body) = frontmatter::split(&text)?;

    let Some(type_name) = meta.get_str("type") else {
        bail!("no `type` in metadata");
    };
    let title = meta.get_str("title").unwrap_or_default();
    let template_meta = registry.template_meta(type_name)?.clone();

    let windows = context::pages_spec(&meta, &template_meta)?.windows(counts)?;
    let build_pattern = context::build_path(&meta, &template_meta)?;
    let inline = registry.compile_inline(path, body)?;

    for window in windows {
        let mut ctx = RenderContext::new(type_name, title, template_meta.clone())
            .with_meta(meta.clone())
            .with_pages(window);

        let rendered_path = template::render_meta(build_pattern, &ctx, counts)
            .context("failed to construct buildPath")?;
        let out_path = rebase(output_dir, &rendered_path);

        // Body first; its render becomes the Content the template sees.
        ctx.content = inline.render(&ctx)?;

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut out = File::create(&out_path)
            .with_context(|| format!("Failed to create {}", out_path.display()))?;
        registry.execute_inherit(type_name, ctx, &mut out)?;
    }

    Ok(())
}

/// Mirror `static/` into the output tree. A project without one is
/// fine.
fn copy_static(static_dir: &Path, output_dir: &Path, has_error: &AtomicBool) -> Result<()> {
    if !static_dir.is_dir() {
        log!("static"; "no static directory found");
        return Ok(());
    }

    let files = collect_files(static_dir);
    files.par_iter().try_for_each(|path| {
        if has_error.load(Ordering::Relaxed) {
            return Err(anyhow!("Aborted"));
        }
        if let Err(e) = copy_static_file(path, static_dir, output_dir) {
            if !has_error.swap(true, Ordering::Relaxed) {
                log!("error"; "{}: {:#}", path.display(), e);
            }
            return Err(anyhow!("Build failed"));
        }
        Ok(())
    })?;

    log!("static"; "copied {} files", files.len());
    Ok(())
}

fn copy_static_file(path: &Path, static_dir: &Path, output_dir: &Path) -> Result<()> {
    let rel = path.strip_prefix(static_dir).unwrap_or(path);
    let destination = output_dir.join(rel);
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::copy(path, &destination)
        .with_context(|| format!("failed to copy `{}`", path.display()))?;
    Ok(())
}

/// Every regular file under `dir`, walk errors skipped. A missing
/// directory is just empty.
fn collect_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Rendered build paths use forward slashes; rebase them under the
/// output directory component by component.
fn rebase(output_dir: &Path, rendered: &str) -> PathBuf {
    let mut path = output_dir.to_path_buf();
    for part in rendered.split('/') {
        if !part.is_empty() && part != "." {
            path.push(part);
        }
    }
    path
}

/// Log build result based on output directory contents
fn log_build_result(output: &Path) -> Result<()> {
    let file_count = fs::read_dir(output)?.filter_map(Result::ok).count();

    if file_count == 0 {
        log!("build"; "output is empty, check content for typed files");
    } else {
        log!("build"; "done");
    }

    Ok(())
}
