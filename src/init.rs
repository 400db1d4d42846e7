//! Project initialization.
//!
//! Creates the directory skeleton plus a starter template pair wired
//! together through `inherit`, enough for a first build to produce
//! output.

use crate::frontmatter::TERMINATOR_LINE;
use crate::log;
use crate::project::{self, Project};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

/// Default project directory structure
const SITE_DIRS: &[&str] = &[
    project::TEMPLATES_DIR,
    project::DRAFTS_DIR,
    project::CONTENT_DIR,
    project::STATIC_DIR,
];

/// Terminal HTML shell. Every other starter template inherits it.
const INDEX_BODY: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>{{ Tmpl.siteTitle }} :: {{ Title }}</title>
  </head>
  <body>
    <h2>{{ Title }}</h2>
    <main>
      {{ Content }}
    </main>
  </body>
</html>
"#;

const PAGE_BODY: &str = r#"<article>
  {{ Content | markdown }}
</article>
"#;

/// Create a new project with the default structure.
pub fn new_project(project: &Project, title: &str, has_name: bool) -> Result<()> {
    let root = project.root();

    // Initializing straight into the current directory is only allowed
    // when it is empty.
    if !has_name && !is_dir_empty(root)? {
        bail!(
            "Current directory is not empty. Use `stencil init <NAME>` to create in a subdirectory."
        );
    }

    init_site_structure(project)?;
    init_starter_templates(project, title)?;

    log!("init"; "project created at `{}`", root.display());
    Ok(())
}

/// Check if a directory is completely empty
fn is_dir_empty(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Create the project directory structure
fn init_site_structure(project: &Project) -> Result<()> {
    for dir in SITE_DIRS {
        let path = project.root().join(dir);
        if path.exists() {
            bail!(
                "Path `{}` already exists. Try `stencil init <NAME>` instead.",
                path.display()
            );
        }
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
    }
    Ok(())
}

/// Write the starter templates: a terminal HTML shell and a markdown
/// page type inheriting it.
fn init_starter_templates(project: &Project, title: &str) -> Result<()> {
    let templates = project.templates_dir();

    let index = format!("siteTitle: {title:?}\n{TERMINATOR_LINE}\n{INDEX_BODY}");
    fs::write(templates.join("index.html"), index)
        .context("Failed to write templates/index.html")?;

    let page = format!("inherit: index.html\n{TERMINATOR_LINE}\n{PAGE_BODY}");
    fs::write(templates.join("page.html"), page)
        .context("Failed to write templates/page.html")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter;

    #[test]
    fn test_init_creates_directories_and_templates() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("site");
        let project = Project::at(&target);

        new_project(&project, "My Site", true).unwrap();

        for sub in SITE_DIRS {
            assert!(target.join(sub).is_dir(), "missing {sub}");
        }

        let index = fs::read_to_string(target.join("templates/index.html")).unwrap();
        let (meta, body) = frontmatter::split(&index).unwrap();
        assert_eq!(meta.get_str("siteTitle"), Some("My Site"));
        assert!(body.contains("{{ Content }}"));

        let page = fs::read_to_string(target.join("templates/page.html")).unwrap();
        let (meta, _) = frontmatter::split(&page).unwrap();
        assert_eq!(meta.get_str("inherit"), Some("index.html"));
    }

    #[test]
    fn test_init_refuses_existing_project() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::at(dir.path().join("site"));

        new_project(&project, "My Site", true).unwrap();
        let err = new_project(&project, "My Site", true).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_init_refuses_nonempty_current_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("occupied.txt"), "x").unwrap();

        let err = new_project(&Project::at(dir.path()), "My Site", false).unwrap_err();
        assert!(err.to_string().contains("not empty"));
    }

    #[test]
    fn test_init_into_empty_current_directory() {
        let dir = tempfile::tempdir().unwrap();
        new_project(&Project::at(dir.path()), "My Site", false).unwrap();
        assert!(dir.path().join("templates/index.html").is_file());
    }
}
