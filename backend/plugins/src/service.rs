/// Plugin service: the public facade over validation, scaffolding, the
/// manifest store and the in-memory registry.
///
/// Cheap to clone; clones share one registry.
use plugsmith_config::{PlugsmithConfig, WorkspaceLayout};
use plugsmith_core::{PluginError, ScaffoldResult};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::manifest::{PluginEntry, PluginManifest};
use crate::registry::{ManifestLoadResult, PluginOpResult, PluginRegistry};
use crate::scaffold::{template_source_for, ScaffoldPipeline};
use crate::store::ManifestStore;
use crate::templates::TemplateSource;
use crate::validation::{self, ValidationError};

/// Result of a full scaffold run together with its progress lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldOutcome {
    #[serde(flatten)]
    pub result: ScaffoldResult,
    pub progress: Vec<String>,
}

#[derive(Clone)]
pub struct PluginService {
    layout: WorkspaceLayout,
    templates: Arc<dyn TemplateSource>,
    registry: Arc<RwLock<PluginRegistry>>,
}

impl PluginService {
    pub fn new(layout: WorkspaceLayout) -> Self {
        let templates = template_source_for(&layout);
        Self::with_templates(layout, templates)
    }

    pub fn with_templates(layout: WorkspaceLayout, templates: Arc<dyn TemplateSource>) -> Self {
        debug!(root = %layout.root.display(), templates = %templates.describe(), "Plugin service ready");
        Self {
            layout,
            templates,
            registry: Arc::new(RwLock::new(PluginRegistry::new())),
        }
    }

    pub fn from_config(config: &PlugsmithConfig) -> Result<Self, PluginError> {
        Ok(Self::new(WorkspaceLayout::resolve(config)?))
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub fn store(&self) -> ManifestStore {
        ManifestStore::new(&self.layout.manifest_path)
    }

    fn pipeline(&self) -> ScaffoldPipeline {
        ScaffoldPipeline::new(self.layout.clone(), self.templates.clone())
    }

    // --- validation ---

    pub fn validate_entry(&self, candidate: &Value) -> Result<PluginEntry, ValidationError> {
        validation::validate_entry(candidate)
    }

    pub fn validate_manifest(&self, candidate: &Value) -> Result<PluginManifest, ValidationError> {
        validation::validate_manifest(candidate)
    }

    // --- scaffolding ---

    pub async fn scaffold_init(&self, entry: &PluginEntry) -> ScaffoldResult {
        self.pipeline().init(entry).await
    }

    pub async fn scaffold_content(&self, entry: &PluginEntry) -> ScaffoldResult {
        self.pipeline().generate_content(entry).await
    }

    /// Upsert into the on-disk manifest; the registry follows on success.
    pub async fn register_plugin(&self, entry: &PluginEntry) -> ScaffoldResult {
        let result = self.pipeline().register(entry).await;
        if result.success {
            self.registry.write().await.upsert(entry.clone());
        }
        result
    }

    pub async fn scaffold(&self, entry: &PluginEntry) -> ScaffoldOutcome {
        let mut pipeline = self.pipeline();
        let result = pipeline.run(entry).await;
        if result.success {
            self.registry.write().await.upsert(entry.clone());
        }
        info!(slug = %entry.slug, state = pipeline.state().label(), "Scaffold run finished");
        ScaffoldOutcome {
            result,
            progress: pipeline.progress().lines(),
        }
    }

    pub async fn recover_registration(&self, entry: &PluginEntry) -> ScaffoldOutcome {
        let mut pipeline = self.pipeline();
        let result = pipeline.recover_after_timeout(entry).await;
        if result.success {
            self.registry.write().await.upsert(entry.clone());
        }
        ScaffoldOutcome {
            result,
            progress: pipeline.progress().lines(),
        }
    }

    // --- registry ---

    pub async fn get_plugins(&self) -> Vec<PluginEntry> {
        self.registry.read().await.list().to_vec()
    }

    pub async fn get_plugin(&self, slug: &str) -> Option<PluginEntry> {
        self.registry.read().await.get(slug).cloned()
    }

    pub async fn install_plugin(&self, candidate: &Value) -> PluginOpResult {
        self.registry.write().await.install(candidate)
    }

    pub async fn update_plugin(&self, slug: &str, fields: &Value) -> PluginOpResult {
        self.registry.write().await.update(slug, fields)
    }

    pub async fn remove_plugin(&self, slug: &str) -> PluginOpResult {
        self.registry.write().await.remove(slug)
    }

    pub async fn enable_plugin(&self, slug: &str) -> PluginOpResult {
        self.registry.write().await.enable(slug)
    }

    pub async fn disable_plugin(&self, slug: &str) -> PluginOpResult {
        self.registry.write().await.disable(slug)
    }

    pub async fn load_manifest(&self, raw: &str) -> ManifestLoadResult {
        self.registry.write().await.load_manifest(raw)
    }

    // --- persistence ---

    /// Replace the registry with the on-disk manifest. A corrupt file is
    /// reported, not hidden.
    pub async fn sync_from_disk(&self) -> ManifestLoadResult {
        match self.store().load_strict().await {
            Ok(manifest) => {
                let plugins = manifest.plugins.clone();
                *self.registry.write().await = PluginRegistry::from_manifest(manifest);
                ManifestLoadResult::loaded(plugins)
            }
            Err(e) => ManifestLoadResult::failed(e),
        }
    }

    /// Write the registry's current contents over the on-disk manifest.
    pub async fn persist(&self) -> ScaffoldResult {
        let manifest = self.registry.read().await.to_manifest();
        match self.store().save(&manifest).await {
            Ok(()) => ScaffoldResult::ok(),
            Err(e) => ScaffoldResult::failed(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> PluginService {
        PluginService::new(WorkspaceLayout::at(dir.path(), &PlugsmithConfig::default()))
    }

    #[tokio::test]
    async fn register_updates_registry() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let entry = PluginEntry::local("demo", "Demo", "./demo");
        assert!(svc.register_plugin(&entry).await.success);
        assert_eq!(svc.get_plugin("demo").await, Some(entry));
    }

    #[tokio::test]
    async fn clones_share_registry() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let other = svc.clone();
        let result = svc
            .install_plugin(&json!({ "slug": "a", "name": "A", "location": "local", "path": "./a" }))
            .await;
        assert!(result.success);
        assert_eq!(other.get_plugins().await.len(), 1);
    }

    #[tokio::test]
    async fn persist_then_sync_round_trips_state() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        svc.install_plugin(&json!({ "slug": "a", "name": "A", "location": "remote", "package": "pkg" }))
            .await;
        svc.disable_plugin("a").await;
        assert!(svc.persist().await.success);

        let fresh = service(&dir);
        let loaded = fresh.sync_from_disk().await;
        assert!(loaded.success);
        assert!(!fresh.get_plugin("a").await.unwrap().enabled);
    }

    #[tokio::test]
    async fn sync_reports_corrupt_manifest() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        std::fs::create_dir_all(dir.path().join(".plugsmith")).unwrap();
        std::fs::write(dir.path().join(".plugsmith/plugins.json"), "[]").unwrap();
        let loaded = svc.sync_from_disk().await;
        assert!(!loaded.success);
        assert!(svc.get_plugins().await.is_empty());
    }

    #[tokio::test]
    async fn scaffold_returns_progress_lines() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let outcome = svc.scaffold(&PluginEntry::local("demo", "Demo", "./demo")).await;
        assert!(outcome.result.success);
        assert_eq!(outcome.progress.len(), 3);
        assert!(outcome.progress[0].starts_with("[demo] initializing: ok"));
        assert!(svc.get_plugin("demo").await.is_some());
    }
}
