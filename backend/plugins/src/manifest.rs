/// Plugin manifest: the persisted, ordered list of plugin entries.
///
/// Serialized as `{ "plugins": [ ... ] }`. Entries keep insertion order so the
/// file diffs cleanly; slugs are unique.
use serde::{Deserialize, Serialize};

/// Where the plugin's code comes from. The tag is serialized as `location`
/// next to the entry's other fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "location", rename_all = "lowercase")]
pub enum PluginSource {
    /// Published package, referenced by name or version range.
    Remote { package: String },
    /// Filesystem path, usually relative to the workspace.
    Local { path: String },
}

impl PluginSource {
    pub fn location(&self) -> &'static str {
        match self {
            Self::Remote { .. } => "remote",
            Self::Local { .. } => "local",
        }
    }

    /// The package reference or path, whichever this source carries.
    pub fn target(&self) -> &str {
        match self {
            Self::Remote { package } => package,
            Self::Local { path } => path,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// A single plugin in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginEntry {
    pub slug: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub source: PluginSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    /// Category tags. Empty means "no groups" and is not serialized.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl PluginEntry {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, source: PluginSource) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            enabled: true,
            source,
            description: None,
            role_definition: None,
            custom_instructions: None,
            groups: Vec::new(),
        }
    }

    pub fn local(slug: impl Into<String>, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(slug, name, PluginSource::Local { path: path.into() })
    }

    pub fn remote(
        slug: impl Into<String>,
        name: impl Into<String>,
        package: impl Into<String>,
    ) -> Self {
        Self::new(slug, name, PluginSource::Remote { package: package.into() })
    }

    pub fn location(&self) -> &'static str {
        self.source.location()
    }
}

/// Outcome of [`PluginManifest::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

impl PluginManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slug: &str) -> Option<&PluginEntry> {
        self.plugins.iter().find(|p| p.slug == slug)
    }

    pub fn position(&self, slug: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.slug == slug)
    }

    /// Replace the entry with the same slug in place, or append.
    pub fn upsert(&mut self, entry: PluginEntry) -> Upsert {
        match self.position(&entry.slug) {
            Some(i) => {
                self.plugins[i] = entry;
                Upsert::Replaced
            }
            None => {
                self.plugins.push(entry);
                Upsert::Inserted
            }
        }
    }

    pub fn remove(&mut self, slug: &str) -> Option<PluginEntry> {
        let i = self.position(slug)?;
        Some(self.plugins.remove(i))
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Pretty-printed (2-space indent) JSON with a trailing newline.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}
