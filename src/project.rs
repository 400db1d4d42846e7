//! Project root discovery and the directory layout.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TEMPLATES_DIR: &str = "templates";
pub const DRAFTS_DIR: &str = "drafts";
pub const CONTENT_DIR: &str = "content";
pub const STATIC_DIR: &str = "static";

/// Project location errors
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(
        "no project found at or above `{0}` (expected `templates/`, `drafts/` and `content/`)"
    )]
    RootNotFound(PathBuf),
}

/// A located project root. All paths the commands touch derive from it.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Wrap a directory without checking its layout. Init uses this
    /// before the directories exist.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walk upward from `start` to the nearest directory that has the
    /// three project directories, so commands work from anywhere inside
    /// the tree.
    pub fn discover(start: &Path) -> Result<Self, ProjectError> {
        start
            .ancestors()
            .find(|dir| Self::is_root(dir))
            .map(Self::at)
            .ok_or_else(|| ProjectError::RootNotFound(start.to_path_buf()))
    }

    fn is_root(dir: &Path) -> bool {
        [TEMPLATES_DIR, DRAFTS_DIR, CONTENT_DIR]
            .iter()
            .all(|name| dir.join(name).is_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(TEMPLATES_DIR)
    }

    pub fn drafts_dir(&self) -> PathBuf {
        self.root.join(DRAFTS_DIR)
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join(CONTENT_DIR)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.root.join(STATIC_DIR)
    }

    /// The output tree, named by the build's `--output` flag.
    pub fn output_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
