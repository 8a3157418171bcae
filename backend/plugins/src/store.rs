/// Manifest store: owns the on-disk plugin manifest.
///
/// Every operation is a fresh read-modify-write of the whole file. There is no
/// locking: concurrent writers race and the last one wins.
use plugsmith_core::{PluginError, ScaffoldResult};
use serde_json::Value;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::manifest::{PluginEntry, PluginManifest, Upsert};
use crate::validation::{check_typed, parse_manifest, salvage_entries};

#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_raw(&self) -> Result<Option<Vec<u8>>, PluginError> {
        match fs::read(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(PluginError::io(self.path.display(), e)),
        }
    }

    fn unreadable(&self, reason: impl std::fmt::Display) -> PluginManifest {
        warn!(
            path = %self.path.display(),
            error = %reason,
            "Manifest is unreadable; continuing with an empty manifest"
        );
        PluginManifest::new()
    }

    /// Load the manifest. A missing file is an empty manifest; so is one that
    /// is not UTF-8 JSON with a `plugins` array, after a warning. Entries that
    /// fail validation are dropped with a warning and the rest are kept. Two
    /// valid entries sharing a slug is an error.
    pub async fn load(&self) -> Result<PluginManifest, PluginError> {
        let Some(raw) = self.read_raw().await? else {
            debug!(path = %self.path.display(), "No manifest yet; starting empty");
            return Ok(PluginManifest::new());
        };
        let text = match String::from_utf8(raw) {
            Ok(text) => text,
            Err(e) => return Ok(self.unreadable(e)),
        };
        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => return Ok(self.unreadable(e)),
        };
        let Some(items) = value.get("plugins").and_then(Value::as_array) else {
            return Ok(self.unreadable("no \"plugins\" array"));
        };

        let (manifest, dropped) = salvage_entries(items)
            .map_err(|e| PluginError::Validation(format!("{}: {e}", self.path.display())))?;
        for issue in &dropped {
            warn!(
                path = %self.path.display(),
                field = %issue.path,
                message = %issue.message,
                "Dropping invalid manifest entry"
            );
        }
        Ok(manifest)
    }

    /// Like [`load`](Self::load) but any corruption is an error.
    pub async fn load_strict(&self) -> Result<PluginManifest, PluginError> {
        let Some(raw) = self.read_raw().await? else {
            return Ok(PluginManifest::new());
        };
        let text = String::from_utf8(raw).map_err(|e| {
            PluginError::Validation(format!("{}: manifest is not UTF-8: {e}", self.path.display()))
        })?;
        parse_manifest(&text)
            .map_err(|e| PluginError::Validation(format!("{}: {e}", self.path.display())))
    }

    /// Write the whole manifest (temp file, then rename).
    pub async fn save(&self, manifest: &PluginManifest) -> Result<(), PluginError> {
        self.ensure_dir().await?;
        let body = manifest
            .to_pretty_json()
            .map_err(|e| PluginError::Other(e.into()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body.as_bytes())
            .await
            .map_err(|e| PluginError::io(tmp.display(), e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PluginError::io(self.path.display(), e))?;
        debug!(path = %self.path.display(), plugins = manifest.len(), "Wrote manifest");
        Ok(())
    }

    async fn ensure_dir(&self) -> Result<(), PluginError> {
        match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => fs::create_dir_all(parent)
                .await
                .map_err(|e| PluginError::io(parent.display(), e)),
            None => Ok(()),
        }
    }

    /// Upsert `entry` by slug and persist.
    pub async fn register(&self, entry: &PluginEntry) -> ScaffoldResult {
        match self.try_register(entry).await {
            Ok(outcome) => {
                info!(slug = %entry.slug, ?outcome, path = %self.path.display(), "Registered plugin");
                ScaffoldResult::ok()
            }
            Err(e) => {
                warn!(slug = %entry.slug, error = %e, "Registration failed");
                ScaffoldResult::failed(&e)
            }
        }
    }

    async fn try_register(&self, entry: &PluginEntry) -> Result<Upsert, PluginError> {
        check_typed(entry).map_err(|e| PluginError::Validation(e.to_string()))?;
        self.ensure_dir().await?;
        let mut manifest = self.load().await?;
        let outcome = manifest.upsert(entry.clone());
        self.save(&manifest).await?;
        Ok(outcome)
    }

    /// Remove `slug` and persist. Unknown slugs leave the file untouched.
    pub async fn remove(&self, slug: &str) -> ScaffoldResult {
        match self.try_remove(slug).await {
            Ok(()) => {
                info!(slug, "Removed plugin from manifest");
                ScaffoldResult::ok()
            }
            Err(e) => ScaffoldResult::failed(&e),
        }
    }

    async fn try_remove(&self, slug: &str) -> Result<(), PluginError> {
        let mut manifest = self.load_strict().await?;
        manifest
            .remove(slug)
            .ok_or_else(|| PluginError::NotFound(slug.to_string()))?;
        self.save(&manifest).await
    }
}
