//! Draft creation.
//!
//! A draft is a metadata skeleton in `drafts/`, named by rendering its
//! template's `sourceName` pattern. The path is printed either way so
//! the command composes with an editor:
//!
//! ```sh
//! $EDITOR "$(stencil draft page.html 'An Example')"
//! ```

use crate::frontmatter::TERMINATOR_LINE;
use crate::pagination::TypeCounts;
use crate::project::Project;
use crate::template::{self, Registry, RenderContext, context};
use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::sync::Arc;

/// Create a draft of `type_name` and print its path. An existing draft
/// is left untouched; only its path is printed.
pub fn new_draft(project: &Project, type_name: &str, title: Option<&str>) -> Result<()> {
    let title = match title {
        Some(title) => title.to_owned(),
        None => Local::now().format("%Y-%m-%d-%H-%M").to_string(),
    };

    let counts = Arc::new(TypeCounts::new(project.content_dir()));
    let registry = Registry::load(&project.templates_dir(), Arc::clone(&counts))
        .context("failed to load templates")?;
    let template_meta = registry.template_meta(type_name)?.clone();

    let ctx = RenderContext::new(type_name, title.as_str(), template_meta.clone());
    let name = template::render_meta(context::source_name(&template_meta)?, &ctx, &counts)?;

    let path = project.drafts_dir().join(&name);
    if path.exists() {
        println!("{}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let skeleton = format!("type: {type_name:?}\ntitle: {title:?}\n\n{TERMINATOR_LINE}\n");
    fs::write(&path, skeleton)
        .with_context(|| format!("failed to create draft `{}`", path.display()))?;

    println!("{}", path.display());
    Ok(())
}
