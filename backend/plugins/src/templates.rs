/// Template sources for the four generated plugin files.
///
/// Built-in templates are compiled in; a workspace can override them with a
/// directory of `*.tmpl` files. A directory source never falls back to the
/// built-ins: a missing file is that file kind's failure.
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::template::Escape;

/// The generated files every plugin gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileKind {
    PackageManifest,
    EntryPoint,
    PluginConfig,
    Readme,
}

impl FileKind {
    pub const ALL: [FileKind; 4] = [
        FileKind::PackageManifest,
        FileKind::EntryPoint,
        FileKind::PluginConfig,
        FileKind::Readme,
    ];

    /// Output file name inside the plugin directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::PackageManifest => "package.json",
            Self::EntryPoint => "index.js",
            Self::PluginConfig => "plugin.config.json",
            Self::Readme => "README.md",
        }
    }

    pub fn template_name(self) -> &'static str {
        match self {
            Self::PackageManifest => "package.json.tmpl",
            Self::EntryPoint => "index.js.tmpl",
            Self::PluginConfig => "plugin.config.json.tmpl",
            Self::Readme => "README.md.tmpl",
        }
    }

    pub fn escape(self) -> Escape {
        match self {
            Self::Readme => Escape::None,
            _ => Escape::Json,
        }
    }
}

#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Human-readable origin for logs.
    fn describe(&self) -> String;

    async fn load(&self, kind: FileKind) -> Result<String>;
}

/// Templates shipped with the crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinTemplates;

impl BuiltinTemplates {
    pub fn get(kind: FileKind) -> &'static str {
        match kind {
            FileKind::PackageManifest => include_str!("../templates/package.json.tmpl"),
            FileKind::EntryPoint => include_str!("../templates/index.js.tmpl"),
            FileKind::PluginConfig => include_str!("../templates/plugin.config.json.tmpl"),
            FileKind::Readme => include_str!("../templates/README.md.tmpl"),
        }
    }
}

#[async_trait]
impl TemplateSource for BuiltinTemplates {
    fn describe(&self) -> String {
        "built-in templates".to_string()
    }

    async fn load(&self, kind: FileKind) -> Result<String> {
        Ok(Self::get(kind).to_string())
    }
}

/// Templates read from `<dir>/<template name>` on every load.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    dir: PathBuf,
}

impl DirectoryTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl TemplateSource for DirectoryTemplates {
    fn describe(&self) -> String {
        format!("templates in {}", self.dir.display())
    }

    async fn load(&self, kind: FileKind) -> Result<String> {
        let path = self.dir.join(kind.template_name());
        debug!(path = %path.display(), "Loading template");
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("template {} not readable at {}", kind.template_name(), path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[tokio::test]
    async fn builtin_has_every_kind() {
        for kind in FileKind::ALL {
            let body = BuiltinTemplates.load(kind).await.unwrap();
            assert!(body.contains("{{"), "{} has no placeholders", kind.template_name());
        }
    }

    #[tokio::test]
    async fn directory_source_reports_missing_template() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md.tmpl"), "# {{name}}\n").unwrap();
        let source = DirectoryTemplates::new(dir.path());

        assert_eq!(source.load(FileKind::Readme).await.unwrap(), "# {{name}}\n");
        let err = source.load(FileKind::EntryPoint).await.unwrap_err();
        assert!(err.to_string().contains("index.js.tmpl"));
    }

    #[test]
    fn output_names_are_distinct() {
        let names: HashSet<_> = FileKind::ALL.iter().map(|k| k.file_name()).collect();
        assert_eq!(names.len(), FileKind::ALL.len());
        let templates: HashSet<_> = FileKind::ALL.iter().map(|k| k.template_name()).collect();
        assert_eq!(templates.len(), FileKind::ALL.len());
    }
}
