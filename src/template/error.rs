//! Template loading and rendering error types.

use crate::frontmatter::MetadataError;
use std::path::PathBuf;
use thiserror::Error;

/// Template-layer errors
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("bad metadata in `{0}`")]
    Metadata(PathBuf, #[source] MetadataError),

    #[error("template syntax error in `{0}`")]
    Syntax(PathBuf, #[source] tera::Error),

    #[error("unknown template {0:?}")]
    UnknownTemplate(String),

    #[error("template inheritance cycle: {}", chain.join(" -> "))]
    InheritanceCycle { chain: Vec<String> },

    #[error("failed to render {name:?}")]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("cannot write rendered output of {name:?}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot build render context")]
    Context(#[source] tera::Error),

    #[error("{field} must be a string")]
    FieldNotString { field: &'static str },
}
