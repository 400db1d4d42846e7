//! Per-type content counting and page-window derivation.
//!
//! The count scan is the only shared mutable state in a build. It runs
//! at most once per `TypeCounts`: the first caller scans the content
//! tree while holding the lock, concurrent callers block on that same
//! scan, and everyone reads the one snapshot afterwards.

use crate::frontmatter::{self, MetadataError};
use parking_lot::Mutex;
use serde::Serialize;
use serde_yaml::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Page size when a `pages` spec does not say otherwise.
pub const DEFAULT_PER_PAGE: i64 = 5;

/// Pagination errors
#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("cannot read `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("bad metadata in `{0}`")]
    Metadata(PathBuf, #[source] MetadataError),

    #[error("pages must be a mapping, found {found}")]
    PagesNotMapping { found: &'static str },

    #[error("page size must be positive, got {0}")]
    InvalidPageSize(i64),
}

/// Lazily-computed counts of published items per `type`.
///
/// Constructed per invocation and passed to whoever needs it; never a
/// process global, so tests can build and drop them freely.
#[derive(Debug)]
pub struct TypeCounts {
    content_dir: PathBuf,
    counts: Mutex<Option<HashMap<String, usize>>>,
}

impl TypeCounts {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            counts: Mutex::new(None),
        }
    }

    /// A `TypeCounts` with a pre-filled snapshot, no backing tree.
    #[cfg(test)]
    pub fn with_counts(entries: &[(&str, usize)]) -> Self {
        let map = entries
            .iter()
            .map(|(name, count)| ((*name).to_owned(), *count))
            .collect();
        Self {
            content_dir: PathBuf::new(),
            counts: Mutex::new(Some(map)),
        }
    }

    /// Number of published items carrying `type: <type_name>`.
    ///
    /// Names never seen count as zero. A failed scan leaves the cache
    /// unpopulated, so the next call retries.
    pub fn count(&self, type_name: &str) -> Result<usize, PaginationError> {
        let mut slot = self.counts.lock();
        if slot.is_none() {
            *slot = Some(self.scan()?);
        }
        Ok(slot
            .as_ref()
            .map_or(0, |map| map.get(type_name).copied().unwrap_or(0)))
    }

    /// Walk the content tree once, splitting every file's metadata and
    /// tallying `type` fields. Files without a string `type` are not
    /// counted under any name.
    fn scan(&self) -> Result<HashMap<String, usize>, PaginationError> {
        let mut counts = HashMap::new();

        for entry in WalkDir::new(&self.content_dir) {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .map_or_else(|| self.content_dir.clone(), Path::to_path_buf);
                PaginationError::Io(path, err.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let text = fs::read_to_string(path)
                .map_err(|err| PaginationError::Io(path.to_path_buf(), err))?;
            let (meta, _) = frontmatter::split(&text)
                .map_err(|err| PaginationError::Metadata(path.to_path_buf(), err))?;

            if let Some(type_name) = meta.get_str("type") {
                *counts.entry(type_name.to_owned()).or_insert(0) += 1;
            }
        }

        Ok(counts)
    }
}

/// A template's pagination request: which type to count and the page
/// size. `tmpl: None` means no counting, one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagesSpec {
    pub tmpl: Option<String>,
    pub per: i64,
}

impl Default for PagesSpec {
    fn default() -> Self {
        Self {
            tmpl: None,
            per: DEFAULT_PER_PAGE,
        }
    }
}

impl PagesSpec {
    /// Interpret a raw `pages` metadata value. Subkeys that are absent
    /// or of the wrong type keep their defaults; a non-mapping value is
    /// an error. An empty `tmpl` string means no counting type.
    pub fn from_value(raw: &Value) -> Result<Self, PaginationError> {
        let Value::Mapping(map) = raw else {
            return Err(PaginationError::PagesNotMapping {
                found: frontmatter::value_kind(raw),
            });
        };

        let mut spec = Self::default();
        if let Some(tmpl) = map.get("tmpl").and_then(Value::as_str)
            && !tmpl.is_empty()
        {
            spec.tmpl = Some(tmpl.to_owned());
        }
        if let Some(per) = map.get("per").and_then(Value::as_i64) {
            spec.per = per;
        }
        Ok(spec)
    }

    /// Derive the page windows this spec asks for.
    ///
    /// No counting type gives the single window `(0, 0)`. Otherwise
    /// `ceil(count / per)` pages, clamped to at least one so that an
    /// empty type still renders a page.
    pub fn windows(&self, counts: &TypeCounts) -> Result<Vec<PageWindow>, PaginationError> {
        let Some(type_name) = &self.tmpl else {
            return Ok(vec![PageWindow {
                current: 1,
                last: 1,
                page_start: 0,
                page_end: 0,
            }]);
        };

        let per = usize::try_from(self.per)
            .ok()
            .filter(|per| *per > 0)
            .ok_or(PaginationError::InvalidPageSize(self.per))?;
        let count = counts.count(type_name)?;
        let num_pages = (count / per + usize::from(count % per != 0)).max(1);

        Ok((1..=num_pages)
            .map(|current| PageWindow {
                current,
                last: num_pages,
                page_start: (current - 1) * per,
                page_end: (current * per).min(count),
            })
            .collect())
    }
}

/// One page's slice of a counted type, exposed to templates as `Pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageWindow {
    pub current: usize,
    pub last: usize,
    pub page_start: usize,
    pub page_end: usize,
}
