//! Draft publication.
//!
//! Publishing moves a draft into `content/`, placed in the directory
//! its rendered `buildPath` points at, stamping missing `type`,
//! `title` and `time` fields into its metadata on the way.

use crate::frontmatter::{self, Metadata, TERMINATOR_LINE};
use crate::log;
use crate::pagination::TypeCounts;
use crate::project::Project;
use crate::template::{self, Registry, RenderContext, context};
use crate::utils::date::Timestamp;
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub fn publish_draft(project: &Project, type_name: &str, title: &str) -> Result<()> {
    let counts = Arc::new(TypeCounts::new(project.content_dir()));
    let registry = Registry::load(&project.templates_dir(), Arc::clone(&counts))
        .context("failed to load templates")?;
    let template_meta = registry.template_meta(type_name)?.clone();

    // Both patterns render before the draft is read: its name and its
    // destination depend only on the type, the title, and the template
    // metadata.
    let ctx = RenderContext::new(type_name, title, template_meta.clone());
    let name = template::render_meta(context::source_name(&template_meta)?, &ctx, &counts)?;
    let no_content_meta = Metadata::new();
    let build_pattern = context::build_path(&no_content_meta, &template_meta)?;
    let rendered_path = template::render_meta(build_pattern, &ctx, &counts)
        .context("failed to construct buildPath")?;

    let draft_path = project.drafts_dir().join(&name);
    let text = fs::read_to_string(&draft_path)
        .with_context(|| format!("failed to open draft `{}`", draft_path.display()))?;
    let (mut meta, body) = frontmatter::split(&text)
        .with_context(|| format!("failed to read metadata from `{}`", draft_path.display()))?;

    // Stamp in whatever the draft's header left out.
    if !meta.contains("type") {
        meta.insert("type", Value::from(type_name));
    }
    if !meta.contains("title") {
        meta.insert("title", Value::from(title));
    }
    if !meta.contains("time") {
        meta.insert("time", Value::from(Timestamp::now().rfc2822));
    }

    let destination_dir = Path::new(&rendered_path).parent().unwrap_or(Path::new(""));
    let destination = project.content_dir().join(destination_dir).join(&name);

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let header = meta.to_yaml()?;
    fs::write(&destination, format!("{header}\n{TERMINATOR_LINE}\n{body}"))
        .with_context(|| format!("failed to create `{}`", destination.display()))?;
    fs::remove_file(&draft_path)
        .with_context(|| format!("failed to remove draft `{}`", draft_path.display()))?;

    log!("publish"; "published to `{}`", destination.display());
    Ok(())
}
