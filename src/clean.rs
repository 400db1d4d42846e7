//! Output cleanup.

use crate::log;
use crate::project::Project;
use anyhow::{Context, Result};
use std::fs;

/// Delete the output directory. An absent one counts as already clean.
pub fn clean_output(project: &Project, output: &str) -> Result<()> {
    let output_dir = project.output_dir(output);
    if !output_dir.exists() {
        log!("clean"; "nothing to remove");
        return Ok(());
    }

    fs::remove_dir_all(&output_dir)
        .with_context(|| format!("failed to remove `{}`", output_dir.display()))?;
    log!("clean"; "removed `{}`", output_dir.display());
    Ok(())
}
