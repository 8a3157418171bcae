//! Template rendering.
//!
//! Two constructs only:
//! - `{{#if field}} ... {{/if}}` keeps its body when `field` is truthy and
//!   drops the whole block otherwise. Blocks do not nest.
//! - `{{field}}` is replaced by the field's value. Unknown names are left as-is.
//!
//! Conditionals are resolved first, then placeholders, in a single pass each,
//! so substituted values are never re-scanned. Output is a pure function of the
//! template and the entry.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

use crate::manifest::{PluginEntry, PluginSource};

static IF_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{\{#if\s+([A-Za-z_][A-Za-z0-9_]*)\s*\}\}(.*?)\{\{/if\}\}").unwrap()
});

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// How substituted values are encoded into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    None,
    /// Contents of a double-quoted JSON/JS string literal.
    Json,
}

/// Fields that already hold JSON and are inserted verbatim in every mode.
const RAW_JSON_FIELDS: &[&str] = &["groups"];

/// Flattened, string-valued view of an entry keyed by its JSON field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    values: BTreeMap<String, String>,
}

impl TemplateContext {
    pub fn from_entry(entry: &PluginEntry) -> Self {
        let mut values = BTreeMap::new();
        values.insert("slug".to_string(), entry.slug.clone());
        values.insert("name".to_string(), entry.name.clone());
        values.insert("enabled".to_string(), entry.enabled.to_string());
        values.insert("location".to_string(), entry.location().to_string());
        match &entry.source {
            PluginSource::Remote { package } => values.insert("package".to_string(), package.clone()),
            PluginSource::Local { path } => values.insert("path".to_string(), path.clone()),
        };
        for (key, value) in [
            ("description", &entry.description),
            ("roleDefinition", &entry.role_definition),
            ("customInstructions", &entry.custom_instructions),
        ] {
            if let Some(value) = value {
                values.insert(key.to_string(), value.clone());
            }
        }
        if !entry.groups.is_empty() {
            let groups = serde_json::to_string(&entry.groups).unwrap_or_else(|_| "[]".to_string());
            values.insert("groups".to_string(), groups);
        }
        Self { values }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Present, non-empty and not `"false"`.
    pub fn is_truthy(&self, field: &str) -> bool {
        matches!(self.get(field), Some(v) if !v.is_empty() && v != "false")
    }

    pub fn escaped(&self, escape: Escape) -> Self {
        match escape {
            Escape::None => self.clone(),
            Escape::Json => Self {
                values: self
                    .values
                    .iter()
                    .map(|(k, v)| {
                        let v = if RAW_JSON_FIELDS.contains(&k.as_str()) {
                            v.clone()
                        } else {
                            json_string_body(v)
                        };
                        (k.clone(), v)
                    })
                    .collect(),
            },
        }
    }
}

fn json_string_body(value: &str) -> String {
    let quoted = serde_json::to_string(value).unwrap_or_default();
    quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(&quoted)
        .to_string()
}

/// Render `template` against `entry` with no value escaping.
pub fn render(template: &str, entry: &PluginEntry) -> String {
    render_context(template, &TemplateContext::from_entry(entry))
}

/// Render with values encoded for the target file type.
pub fn render_escaped(template: &str, entry: &PluginEntry, escape: Escape) -> String {
    render_context(template, &TemplateContext::from_entry(entry).escaped(escape))
}

pub fn render_context(template: &str, ctx: &TemplateContext) -> String {
    let resolved = IF_BLOCK.replace_all(template, |caps: &Captures| {
        if ctx.is_truthy(&caps[1]) {
            caps[2].to_string()
        } else {
            String::new()
        }
    });
    PLACEHOLDER
        .replace_all(&resolved, |caps: &Captures| match ctx.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
