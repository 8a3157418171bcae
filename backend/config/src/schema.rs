//! Plugsmith workspace configuration schema.
//!
//! Every field is optional on disk; `defaults::apply_all_defaults` fills the
//! gaps after loading.

use serde::{Deserialize, Serialize};

/// Root configuration for a Plugsmith workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlugsmithConfig {
    /// Directory that owns the manifest and the plugin tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<String>,

    /// Directory (relative to the workspace root) holding one folder per plugin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins_dir: Option<String>,

    /// Manifest file path, relative to the workspace root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,

    /// Directory of `*.tmpl` overrides. Built-in templates are used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `trace` | `debug` | `info` | `warn` | `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for the rolling NDJSON log file. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let raw = "workspaceRoot: /tmp/ws\npluginsDir: ext\nlogging:\n  level: debug\n";
        let cfg: PlugsmithConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(cfg.workspace_root.as_deref(), Some("/tmp/ws"));
        assert_eq!(cfg.plugins_dir.as_deref(), Some("ext"));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("debug"));
    }

    #[test]
    fn empty_config_serializes_to_empty_object() {
        let json = serde_json::to_value(PlugsmithConfig::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
