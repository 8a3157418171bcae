//! Plugin entry and manifest validation.
//!
//! Validation runs on the raw JSON candidate, before any typed entry exists,
//! so contradictory input (a remote plugin that also carries a `path`) is
//! reported instead of silently dropped by deserialization. Every field is
//! checked and all issues are returned together.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::manifest::{PluginEntry, PluginManifest, PluginSource};

static SLUG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap());

/// One problem with one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", format_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.path, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue {
                path: path.into(),
                message: message.into(),
            }],
        }
    }

    /// True when some issue points at `field` (last path segment).
    pub fn mentions(&self, field: &str) -> bool {
        self.issues
            .iter()
            .any(|i| i.path == field || i.path.ends_with(&format!(".{field}")))
    }
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_PATTERN.is_match(slug)
}

/// Collects issues under a path prefix such as `plugins[2].`.
struct Collector<'a> {
    prefix: &'a str,
    issues: &'a mut Vec<ValidationIssue>,
}

impl Collector<'_> {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path: format!("{}{field}", self.prefix),
            message: message.into(),
        });
    }
}

/// Validate a single candidate entry.
pub fn validate_entry(candidate: &Value) -> Result<PluginEntry, ValidationError> {
    let mut issues = Vec::new();
    let entry = check_entry(candidate, "", &mut issues);
    match entry {
        Some(entry) if issues.is_empty() => Ok(entry),
        _ => Err(ValidationError { issues }),
    }
}

/// Re-check an already typed entry; the type only enforces the location partition.
pub fn check_typed(entry: &PluginEntry) -> Result<(), ValidationError> {
    let value = serde_json::to_value(entry)
        .map_err(|e| ValidationError::single("entry", format!("cannot serialize entry: {e}")))?;
    validate_entry(&value).map(|_| ())
}

/// Validate a whole manifest; every entry is checked, then slug uniqueness.
pub fn validate_manifest(candidate: &Value) -> Result<PluginManifest, ValidationError> {
    let Some(root) = candidate.as_object() else {
        return Err(ValidationError::single("manifest", "must be a JSON object"));
    };
    let items = match root.get("plugins") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::single("plugins", "must be an array")),
        None => return Err(ValidationError::single("plugins", "is required")),
    };

    let mut issues = Vec::new();
    let mut plugins = Vec::with_capacity(items.len());
    let mut first_seen: HashMap<&str, usize> = HashMap::new();

    for (i, item) in items.iter().enumerate() {
        let prefix = format!("plugins[{i}].");
        if let Some(entry) = check_entry(item, &prefix, &mut issues) {
            plugins.push(entry);
        }
        if let Some(slug) = item.get("slug").and_then(Value::as_str) {
            if let Some(first) = first_seen.get(slug) {
                issues.push(ValidationIssue {
                    path: format!("{prefix}slug"),
                    message: format!("duplicate slug \"{slug}\" (first defined at plugins[{first}])"),
                });
            } else {
                first_seen.insert(slug, i);
            }
        }
    }

    if issues.is_empty() {
        Ok(PluginManifest { plugins })
    } else {
        Err(ValidationError { issues })
    }
}

/// Parse and validate manifest text.
pub fn parse_manifest(raw: &str) -> Result<PluginManifest, ValidationError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ValidationError::single("manifest", format!("invalid JSON: {e}")))?;
    validate_manifest(&value)
}

/// Keep the entries of `items` that validate on their own.
///
/// Returns the kept manifest and the issues of the dropped entries. Two kept
/// entries sharing a slug is an error: there is no safe entry to drop.
pub fn salvage_entries(items: &[Value]) -> Result<(PluginManifest, Vec<ValidationIssue>), ValidationError> {
    let mut dropped = Vec::new();
    let mut duplicates = Vec::new();
    let mut plugins: Vec<PluginEntry> = Vec::with_capacity(items.len());
    let mut first_seen: HashMap<String, usize> = HashMap::new();

    for (i, item) in items.iter().enumerate() {
        let prefix = format!("plugins[{i}].");
        let Some(entry) = check_entry(item, &prefix, &mut dropped) else {
            continue;
        };
        if let Some(first) = first_seen.get(&entry.slug) {
            duplicates.push(ValidationIssue {
                path: format!("{prefix}slug"),
                message: format!("duplicate slug \"{}\" (first defined at plugins[{first}])", entry.slug),
            });
            continue;
        }
        first_seen.insert(entry.slug.clone(), i);
        plugins.push(entry);
    }

    if duplicates.is_empty() {
        Ok((PluginManifest { plugins }, dropped))
    } else {
        Err(ValidationError { issues: duplicates })
    }
}

fn check_entry(candidate: &Value, prefix: &str, issues: &mut Vec<ValidationIssue>) -> Option<PluginEntry> {
    let Some(obj) = candidate.as_object() else {
        let path = prefix.strip_suffix('.').unwrap_or("entry");
        issues.push(ValidationIssue {
            path: path.to_string(),
            message: "must be a JSON object".into(),
        });
        return None;
    };

    let before = issues.len();
    let mut c = Collector { prefix, issues };

    let slug = match present(obj, "slug") {
        None => {
            c.push("slug", "is required");
            None
        }
        Some(Value::String(s)) if s.is_empty() => {
            c.push("slug", "cannot be empty");
            None
        }
        Some(Value::String(s)) if !is_valid_slug(s) => {
            c.push(
                "slug",
                format!("\"{s}\" must be lowercase letters and digits separated by single hyphens"),
            );
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            c.push("slug", "must be a string");
            None
        }
    };

    let name = match present(obj, "name") {
        None => {
            c.push("name", "is required");
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            c.push("name", "cannot be empty");
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            c.push("name", "must be a string");
            None
        }
    };

    let package = optional_string(obj, "package", &mut c);
    let path = optional_string(obj, "path", &mut c);

    let source = match present(obj, "location").map(|v| v.as_str()) {
        None => {
            c.push("location", "is required");
            None
        }
        Some(Some("remote")) => {
            if package.is_none() && !has(obj, "package") {
                c.push("package", "is required when location is \"remote\"");
            }
            if has(obj, "path") {
                c.push("path", "is not allowed when location is \"remote\"");
            }
            package.map(|package| PluginSource::Remote { package })
        }
        Some(Some("local")) => {
            if path.is_none() && !has(obj, "path") {
                c.push("path", "is required when location is \"local\"");
            }
            if has(obj, "package") {
                c.push("package", "is not allowed when location is \"local\"");
            }
            path.map(|path| PluginSource::Local { path })
        }
        Some(_) => {
            c.push("location", "must be \"remote\" or \"local\"");
            None
        }
    };

    let enabled = match present(obj, "enabled") {
        None => true,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            c.push("enabled", "must be a boolean");
            true
        }
    };

    let description = optional_string(obj, "description", &mut c);
    let role_definition = optional_string(obj, "roleDefinition", &mut c);
    let custom_instructions = optional_string(obj, "customInstructions", &mut c);
    let groups = groups(obj, &mut c);

    if c.issues.len() > before {
        return None;
    }

    Some(PluginEntry {
        slug: slug?,
        name: name?,
        enabled,
        source: source?,
        description,
        role_definition,
        custom_instructions,
        groups,
    })
}

/// `null` is treated the same as an absent field.
fn present<'v>(obj: &'v Map<String, Value>, field: &str) -> Option<&'v Value> {
    obj.get(field).filter(|v| !v.is_null())
}

fn has(obj: &Map<String, Value>, field: &str) -> bool {
    present(obj, field).is_some()
}

/// Optional text field. Empty strings count as present for `package`/`path`
/// partition checks but are rejected as values.
fn optional_string(obj: &Map<String, Value>, field: &str, c: &mut Collector<'_>) -> Option<String> {
    match present(obj, field) {
        None => None,
        Some(Value::String(s)) if s.trim().is_empty() && matches!(field, "package" | "path") => {
            c.push(field, "cannot be empty");
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            c.push(field, "must be a string");
            None
        }
    }
}

fn groups(obj: &Map<String, Value>, c: &mut Collector<'_>) -> Vec<String> {
    let items = match present(obj, "groups") {
        None => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            c.push("groups", "must be an array of strings");
            return Vec::new();
        }
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item.as_str() {
            Some(s) if !s.trim().is_empty() => out.push(s.to_string()),
            Some(_) => c.push(&format!("groups[{i}]"), "cannot be empty"),
            None => c.push(&format!("groups[{i}]"), "must be a string"),
        }
    }
    out
}
