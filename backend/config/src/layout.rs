//! Concrete on-disk layout derived from a prepared config.

use plugsmith_core::PluginError;
use std::path::{Path, PathBuf};

use crate::defaults::{DEFAULT_MANIFEST_PATH, DEFAULT_PLUGINS_DIR};
use crate::schema::PlugsmithConfig;

/// Resolved workspace paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub root: PathBuf,
    pub plugins_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub templates_dir: Option<PathBuf>,
}

impl WorkspaceLayout {
    /// Resolve the layout. A missing or non-directory workspace root is an
    /// environment error: nothing can be scaffolded without one.
    pub fn resolve(config: &PlugsmithConfig) -> Result<Self, PluginError> {
        let root = match config.workspace_root.as_deref() {
            Some(root) => PathBuf::from(root),
            None => std::env::current_dir().map_err(|e| {
                PluginError::Environment(format!("no workspace root available: {e}"))
            })?,
        };
        if !root.is_dir() {
            return Err(PluginError::Environment(format!(
                "workspace root {} does not exist or is not a directory",
                root.display()
            )));
        }
        Ok(Self::at(root, config))
    }

    /// Build the layout under `root` without touching the filesystem.
    pub fn at(root: impl Into<PathBuf>, config: &PlugsmithConfig) -> Self {
        let root = root.into();
        let plugins_dir = root.join(config.plugins_dir.as_deref().unwrap_or(DEFAULT_PLUGINS_DIR));
        let manifest_path =
            root.join(config.manifest_path.as_deref().unwrap_or(DEFAULT_MANIFEST_PATH));
        let templates_dir = config.templates_dir.as_deref().map(|dir| {
            let dir = Path::new(dir);
            if dir.is_absolute() {
                dir.to_path_buf()
            } else {
                root.join(dir)
            }
        });
        Self {
            root,
            plugins_dir,
            manifest_path,
            templates_dir,
        }
    }

    /// Target directory of a single plugin.
    pub fn plugin_dir(&self, slug: &str) -> PathBuf {
        self.plugins_dir.join(slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_layout() {
        let layout = WorkspaceLayout::at("/ws", &PlugsmithConfig::default());
        assert_eq!(layout.plugin_dir("demo"), PathBuf::from("/ws/plugins/demo"));
        assert_eq!(layout.manifest_path, PathBuf::from("/ws/.plugsmith/plugins.json"));
        assert!(layout.templates_dir.is_none());
    }

    #[test]
    fn relative_templates_dir_joins_root() {
        let cfg = PlugsmithConfig {
            templates_dir: Some("tmpl".into()),
            ..Default::default()
        };
        let layout = WorkspaceLayout::at("/ws", &cfg);
        assert_eq!(layout.templates_dir, Some(PathBuf::from("/ws/tmpl")));
    }

    #[test]
    fn missing_root_is_environment_error() {
        let dir = TempDir::new().unwrap();
        let cfg = PlugsmithConfig {
            workspace_root: Some(dir.path().join("gone").display().to_string()),
            ..Default::default()
        };
        let err = WorkspaceLayout::resolve(&cfg).unwrap_err();
        assert!(matches!(err, PluginError::Environment(_)));
    }

    #[test]
    fn existing_root_resolves() {
        let dir = TempDir::new().unwrap();
        let cfg = PlugsmithConfig {
            workspace_root: Some(dir.path().display().to_string()),
            ..Default::default()
        };
        let layout = WorkspaceLayout::resolve(&cfg).unwrap();
        assert_eq!(layout.root, dir.path());
    }
}
