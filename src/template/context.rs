//! Render contexts and the recognized metadata fields.
//!
//! Field lookups are layered: content metadata first, then template
//! metadata, then the built-in default. In practice `type` and `title`
//! live in content files and the rest in templates, but content files
//! may override `buildPath` and `pages` per item.

use crate::frontmatter::Metadata;
use crate::pagination::{PageWindow, PagesSpec, PaginationError};
use crate::template::error::TemplateError;
use serde::Serialize;

/// Draft filename pattern when a template declares no `sourceName`.
pub const DEFAULT_SOURCE_NAME: &str = "{{ Title | slug }}.md";

/// Output path pattern when neither content nor template declares a
/// `buildPath`.
pub const DEFAULT_BUILD_PATH: &str = "{{ Title | slug }}/index.{{ Type | ext }}";

/// The data a template evaluation sees. Serialized field names are the
/// capitalized ones templates use: `Type`, `Title`, `Tmpl`, `Meta`,
/// `Content`, `Pages`.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    #[serde(rename = "Type")]
    pub type_name: String,

    #[serde(rename = "Title")]
    pub title: String,

    /// The invoking template's metadata. A per-render copy: the
    /// inheritance walk merges ancestor metadata into it.
    #[serde(rename = "Tmpl")]
    pub tmpl: Metadata,

    /// The content file's own metadata.
    #[serde(rename = "Meta")]
    pub meta: Metadata,

    /// Rendered body, replaced on every ancestor hop. Empty for the
    /// content-body render itself.
    #[serde(rename = "Content")]
    pub content: String,

    #[serde(rename = "Pages", skip_serializing_if = "Option::is_none")]
    pub pages: Option<PageWindow>,
}

impl RenderContext {
    /// A context with no content metadata, no content and no pages,
    /// which is what the draft and publish workflows feed the
    /// meta-templater.
    pub fn new(type_name: impl Into<String>, title: impl Into<String>, tmpl: Metadata) -> Self {
        Self {
            type_name: type_name.into(),
            title: title.into(),
            tmpl,
            meta: Metadata::new(),
            content: String::new(),
            pages: None,
        }
    }

    pub fn with_meta(mut self, meta: Metadata) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_pages(mut self, window: PageWindow) -> Self {
        self.pages = Some(window);
        self
    }

    pub(crate) fn to_tera(&self) -> Result<tera::Context, TemplateError> {
        tera::Context::from_serialize(self).map_err(TemplateError::Context)
    }
}

/// `sourceName` from the template metadata, or the default pattern.
pub fn source_name(template_meta: &Metadata) -> Result<&str, TemplateError> {
    field_template("sourceName", DEFAULT_SOURCE_NAME, &[template_meta])
}

/// `buildPath`, content metadata winning over template metadata.
pub fn build_path<'a>(
    content_meta: &'a Metadata,
    template_meta: &'a Metadata,
) -> Result<&'a str, TemplateError> {
    field_template("buildPath", DEFAULT_BUILD_PATH, &[content_meta, template_meta])
}

/// `pages`, content metadata winning over template metadata.
pub fn pages_spec(
    content_meta: &Metadata,
    template_meta: &Metadata,
) -> Result<PagesSpec, PaginationError> {
    for meta in [content_meta, template_meta] {
        if let Some(raw) = meta.get("pages") {
            return PagesSpec::from_value(raw);
        }
    }
    Ok(PagesSpec::default())
}

/// The ancestor a template declares. A missing or non-string `inherit`
/// means the template is terminal.
pub fn inherit(template_meta: &Metadata) -> Option<&str> {
    template_meta.get_str("inherit")
}

/// First layer holding `field` wins; present-but-not-a-string is an
/// error rather than a silent fallthrough.
fn field_template<'a>(
    field: &'static str,
    default: &'a str,
    layers: &[&'a Metadata],
) -> Result<&'a str, TemplateError> {
    for meta in layers {
        if let Some(value) = meta.get(field) {
            return value
                .as_str()
                .ok_or(TemplateError::FieldNotString { field });
        }
    }
    Ok(default)
}
