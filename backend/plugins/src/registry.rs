/// Plugin registry: in-memory, ordered index over a manifest.
///
/// Independent of persistence: callers decide when to load it from or write it
/// back to a [`ManifestStore`](crate::store::ManifestStore).
use plugsmith_core::PluginError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::manifest::{PluginEntry, PluginManifest};
use crate::validation::{parse_manifest, validate_entry};

/// Response shape of registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginOpResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PluginOpResult {
    fn ok(plugin: PluginEntry) -> Self {
        Self {
            success: true,
            plugin: Some(plugin),
            error: None,
        }
    }

    fn err(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            plugin: None,
            error: Some(error.to_string()),
        }
    }
}

impl From<Result<PluginEntry, PluginError>> for PluginOpResult {
    fn from(result: Result<PluginEntry, PluginError>) -> Self {
        match result {
            Ok(plugin) => Self::ok(plugin),
            Err(e) => Self::err(e),
        }
    }
}

/// Response shape of [`PluginRegistry::load_manifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestLoadResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<PluginEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ManifestLoadResult {
    pub fn loaded(plugins: Vec<PluginEntry>) -> Self {
        Self {
            success: true,
            plugins: Some(plugins),
            error: None,
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            plugins: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<PluginEntry>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manifest(manifest: PluginManifest) -> Self {
        Self {
            plugins: manifest.plugins,
        }
    }

    pub fn to_manifest(&self) -> PluginManifest {
        PluginManifest {
            plugins: self.plugins.clone(),
        }
    }

    pub fn list(&self) -> &[PluginEntry] {
        &self.plugins
    }

    pub fn get(&self, slug: &str) -> Option<&PluginEntry> {
        self.plugins.iter().find(|p| p.slug == slug)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    fn index_of(&self, slug: &str) -> Result<usize, PluginError> {
        self.plugins
            .iter()
            .position(|p| p.slug == slug)
            .ok_or_else(|| PluginError::NotFound(slug.to_string()))
    }

    /// Insert an already validated entry; duplicate slugs are rejected.
    pub fn insert(&mut self, entry: PluginEntry) -> Result<PluginEntry, PluginError> {
        if self.get(&entry.slug).is_some() {
            return Err(PluginError::AlreadyExists(entry.slug));
        }
        info!(slug = %entry.slug, "Installed plugin");
        self.plugins.push(entry.clone());
        Ok(entry)
    }

    /// Replace by slug or append; used after a manifest registration.
    pub fn upsert(&mut self, entry: PluginEntry) {
        match self.plugins.iter().position(|p| p.slug == entry.slug) {
            Some(i) => self.plugins[i] = entry,
            None => self.plugins.push(entry),
        }
    }

    pub fn install(&mut self, candidate: &Value) -> PluginOpResult {
        let entry = validate_entry(candidate).map_err(|e| PluginError::Validation(e.to_string()));
        entry.and_then(|entry| self.insert(entry)).into()
    }

    /// Merge `fields` onto the current entry (JSON merge patch: `null` removes a
    /// field) and re-validate the result. The slug cannot change.
    pub fn update(&mut self, slug: &str, fields: &Value) -> PluginOpResult {
        self.try_update(slug, fields).into()
    }

    fn try_update(&mut self, slug: &str, fields: &Value) -> Result<PluginEntry, PluginError> {
        let index = self.index_of(slug)?;
        if !fields.is_object() {
            return Err(PluginError::Validation("update fields must be a JSON object".into()));
        }
        if let Some(new_slug) = fields.get("slug").filter(|v| v.as_str() != Some(slug)) {
            return Err(PluginError::Validation(format!(
                "slug: is immutable (tried to change \"{slug}\" to {new_slug})"
            )));
        }

        let mut merged = serde_json::to_value(&self.plugins[index]).map_err(anyhow::Error::from)?;
        json_merge_patch(&mut merged, fields);
        let entry = validate_entry(&merged).map_err(|e| PluginError::Validation(e.to_string()))?;

        debug!(slug, "Updated plugin");
        self.plugins[index] = entry.clone();
        Ok(entry)
    }

    pub fn remove(&mut self, slug: &str) -> PluginOpResult {
        let result = self.index_of(slug).map(|i| self.plugins.remove(i));
        if result.is_ok() {
            info!(slug, "Removed plugin");
        }
        result.into()
    }

    pub fn enable(&mut self, slug: &str) -> PluginOpResult {
        self.set_enabled(slug, true)
    }

    pub fn disable(&mut self, slug: &str) -> PluginOpResult {
        self.set_enabled(slug, false)
    }

    fn set_enabled(&mut self, slug: &str, enabled: bool) -> PluginOpResult {
        self.index_of(slug)
            .map(|i| {
                self.plugins[i].enabled = enabled;
                self.plugins[i].clone()
            })
            .into()
    }

    /// Replace the registry with the manifest in `raw`. All-or-nothing: one bad
    /// entry rejects the load and the registry keeps its previous contents.
    pub fn load_manifest(&mut self, raw: &str) -> ManifestLoadResult {
        match parse_manifest(raw) {
            Ok(manifest) => {
                info!(plugins = manifest.len(), "Loaded manifest into registry");
                self.plugins = manifest.plugins;
                ManifestLoadResult::loaded(self.plugins.clone())
            }
            Err(e) => {
                warn!(error = %e, "Rejected manifest");
                ManifestLoadResult::failed(e)
            }
        }
    }
}

/// RFC 7396 JSON Merge Patch.
fn json_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Default::default());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                json_merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> PluginRegistry {
        let mut reg = PluginRegistry::new();
        reg.insert(PluginEntry::local("demo", "Demo", "./demo")).unwrap();
        reg
    }

    #[test]
    fn install_validates_and_rejects_duplicates() {
        let mut reg = registry();
        let ok = reg.install(&json!({ "slug": "two", "name": "Two", "location": "remote", "package": "p" }));
        assert!(ok.success);
        assert_eq!(ok.plugin.unwrap().slug, "two");

        let dup = reg.install(&json!({ "slug": "demo", "name": "Again", "location": "local", "path": "." }));
        assert!(!dup.success);
        assert!(dup.error.unwrap().contains("already installed"));

        let bad = reg.install(&json!({ "slug": "Nope!", "name": "x", "location": "local", "path": "." }));
        assert!(!bad.success);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn update_merges_partial_fields() {
        let mut reg = registry();
        let result = reg.update("demo", &json!({ "description": "Now described", "groups": ["read"] }));
        assert!(result.success, "{:?}", result.error);
        let entry = reg.get("demo").unwrap();
        assert_eq!(entry.description.as_deref(), Some("Now described"));
        assert_eq!(entry.groups, vec!["read".to_string()]);
        assert_eq!(entry.name, "Demo");
    }

    #[test]
    fn update_can_switch_location_with_null() {
        let mut reg = registry();
        let conflicting = reg.update("demo", &json!({ "location": "remote", "package": "pkg" }));
        assert!(!conflicting.success);
        assert!(conflicting.error.unwrap().contains("path"));

        let switched = reg.update("demo", &json!({ "location": "remote", "package": "pkg", "path": null }));
        assert!(switched.success);
        assert_eq!(reg.get("demo").unwrap().location(), "remote");
    }

    #[test]
    fn update_rejects_slug_change_and_unknown_slug() {
        let mut reg = registry();
        assert!(!reg.update("demo", &json!({ "slug": "renamed" })).success);
        assert!(reg.update("demo", &json!({ "slug": "demo", "name": "Same slug" })).success);
        let missing = reg.update("ghost", &json!({ "name": "x" }));
        assert!(missing.error.unwrap().contains("not found"));
    }

    #[test]
    fn remove_missing_slug_reports_not_found() {
        let mut reg = registry();
        let result = reg.remove("ghost");
        assert!(!result.success);
        assert!(result.error.unwrap().contains("not found"));
        assert_eq!(reg.len(), 1);
        assert!(reg.remove("demo").success);
        assert!(reg.is_empty());
    }

    #[test]
    fn enable_and_disable() {
        let mut reg = registry();
        assert!(!reg.disable("demo").plugin.unwrap().enabled);
        assert!(!reg.get("demo").unwrap().enabled);
        assert!(reg.enable("demo").plugin.unwrap().enabled);
        assert!(!reg.enable("ghost").success);
    }

    #[test]
    fn load_manifest_is_all_or_nothing() {
        let mut reg = PluginRegistry::new();
        let raw = json!({ "plugins": [
            { "slug": "good", "name": "Good", "location": "local", "path": "./good" },
            { "slug": "bad", "name": "Bad", "location": "remote", "path": "./bad" }
        ]})
        .to_string();
        let result = reg.load_manifest(&raw);
        assert!(!result.success);
        assert!(result.plugins.is_none());
        assert!(reg.is_empty());

        let raw = json!({ "plugins": [
            { "slug": "good", "name": "Good", "location": "local", "path": "./good" }
        ]})
        .to_string();
        let result = reg.load_manifest(&raw);
        assert!(result.success);
        assert_eq!(result.plugins.unwrap().len(), 1);
        assert!(reg.get("good").is_some());
    }

    #[test]
    fn merge_patch_nested() {
        let mut target = json!({ "a": { "b": 1, "c": 2 }, "d": 3 });
        json_merge_patch(&mut target, &json!({ "a": { "b": null, "e": 4 }, "d": null }));
        assert_eq!(target, json!({ "a": { "c": 2, "e": 4 } }));
    }
}
