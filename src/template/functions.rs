//! The function library available inside every template evaluation.
//!
//! String helpers are filters, so they compose in pipelines
//! (`{{ Title | slug }}`); `tmpl` and `pages` take named arguments.
//! The same set is registered on registry engines and on the one-shot
//! meta-templater engines, the only difference being whether a registry
//! snapshot is bound for `tmpl` to resolve against.

use crate::pagination::TypeCounts;
use crate::utils::date::{TimeError, Timestamp};
use pulldown_cmark::{Options, Parser, html};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tera::{Context, Tera, Value, to_value};

/// Register the filters and functions on an engine.
///
/// `registry` is the completed-engine snapshot that `tmpl` renders
/// sibling templates against; `None` leaves `tmpl` registered but
/// failing, which is what the meta-templater wants.
pub fn register(
    engine: &mut Tera,
    registry: Option<Arc<OnceLock<Tera>>>,
    counts: Arc<TypeCounts>,
) {
    engine.register_filter("markdown", markdown);
    engine.register_filter("slug", slug);
    engine.register_filter("time", time);
    engine.register_filter("trimExt", trim_ext);
    engine.register_filter("ext", ext);
    engine.register_function("pages", pages(counts));
    engine.register_function("tmpl", tmpl(registry));
}

// ============================================================================
// Filters
// ============================================================================

/// `{{ body | markdown }}` renders CommonMark to HTML.
fn markdown(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let input = as_str(value, "markdown")?;
    let parser = Parser::new_ext(
        input,
        Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH,
    );
    let mut out = String::new();
    html::push_html(&mut out, parser);
    Ok(Value::String(out))
}

/// `{{ Title | slug }}` normalizes to a lowercase, hyphen-separated,
/// URL/filename-safe string.
fn slug(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(slug::slugify(as_str(value, "slug")?)))
}

/// `{{ Meta.time | time }}` turns an epoch integer or a formatted
/// string into a `Timestamp` object.
fn time(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let timestamp = match value {
        Value::Number(n) => match n.as_i64() {
            Some(secs) => Timestamp::from_unix(secs),
            None => Err(TimeError::UnsupportedType {
                found: "non-integer number",
            }),
        },
        Value::String(s) => Timestamp::parse(s),
        other => Err(TimeError::UnsupportedType {
            found: json_kind(other),
        }),
    }
    .map_err(|err| tera::Error::msg(err.to_string()))?;

    Ok(to_value(timestamp)?)
}

/// `{{ name | trimExt }}` drops the final element's extension.
fn trim_ext(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let name = as_str(value, "trimExt")?;
    let trimmed = name.strip_suffix(ext_with_dot(name)).unwrap_or(name);
    Ok(Value::String(trimmed.to_owned()))
}

/// `{{ Type | ext }}` is the final element's extension without its dot,
/// or empty.
fn ext(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let name = as_str(value, "ext")?;
    let ext = ext_with_dot(name).strip_prefix('.').unwrap_or("");
    Ok(Value::String(ext.to_owned()))
}

/// Extension (including the dot) of the last slash-separated element.
/// A dot in a parent directory does not count.
fn ext_with_dot(name: &str) -> &str {
    let base = name.rsplit('/').next().unwrap_or(name);
    match base.rfind('.') {
        Some(idx) => &base[idx..],
        None => "",
    }
}

// ============================================================================
// Functions
// ============================================================================

/// `pages(type="post.html", per=5)` is the bare page-count lookup:
/// `ceil(count / per)`, zero pages for an empty type.
fn pages(
    counts: Arc<TypeCounts>,
) -> impl Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync {
    move |args| {
        let type_name = args
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("pages requires a string `type` argument"))?;
        let per = args
            .get("per")
            .and_then(Value::as_i64)
            .ok_or_else(|| tera::Error::msg("pages requires an integer `per` argument"))?;
        let per = usize::try_from(per)
            .ok()
            .filter(|per| *per > 0)
            .ok_or_else(|| tera::Error::msg(format!("page size must be positive, got {per}")))?;

        let count = counts
            .count(type_name)
            .map_err(|err| tera::Error::msg(err.to_string()))?;
        Ok(Value::from(count / per + usize::from(count % per != 0)))
    }
}

/// `tmpl(name="sidebar.html", data=...)` renders a sibling template
/// from the registry. `data` must be an object when given; without it
/// the sibling renders against an empty context.
fn tmpl(
    registry: Option<Arc<OnceLock<Tera>>>,
) -> impl Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync {
    move |args| {
        let Some(registry) = &registry else {
            return Err(tera::Error::msg("tmpl is unavailable in this context"));
        };
        let Some(engine) = registry.get() else {
            return Err(tera::Error::msg("template registry is still loading"));
        };

        let name = args
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("tmpl requires a string `name` argument"))?;
        if engine.get_template(name).is_err() {
            return Err(tera::Error::msg(format!("unknown template {name:?}")));
        }

        let context = match args.get("data") {
            Some(data) => Context::from_value(data.clone())?,
            None => Context::new(),
        };
        Ok(Value::String(engine.render(name, &context)?))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn as_str<'a>(value: &'a Value, filter: &str) -> tera::Result<&'a str> {
    value.as_str().ok_or_else(|| {
        tera::Error::msg(format!(
            "{filter} expects a string, found {}",
            json_kind(value)
        ))
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
