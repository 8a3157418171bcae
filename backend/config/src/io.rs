//! Config file read/write.

use crate::schema::PlugsmithConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name inside a workspace or the user config directory.
pub const CONFIG_FILE_NAME: &str = "plugsmith.yaml";

/// Resolve the user-level config directory.
/// Priority: `PLUGSMITH_CONFIG_DIR` env > `~/.plugsmith/` > `./.plugsmith`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PLUGSMITH_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".plugsmith"),
        None => PathBuf::from(".plugsmith"),
    }
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist. Files ending in
/// `.json` are parsed as JSON, anything else as YAML.
pub async fn load_config(path: &Path) -> Result<PlugsmithConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(PlugsmithConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&raw, is_json(path))
        .with_context(|| format!("Failed to parse config at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

fn parse_config(raw: &str, json: bool) -> Result<PlugsmithConfig> {
    if raw.trim().is_empty() {
        return Ok(PlugsmithConfig::default());
    }
    if json {
        Ok(serde_json::from_str(raw)?)
    } else {
        Ok(serde_yaml::from_str(raw)?)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

/// Write config to disk (temp file, then rename).
pub async fn write_config(config: &PlugsmithConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    let body = if is_json(path) {
        serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")?
    } else {
        serde_yaml::to_string(config).context("Failed to serialize config to YAML")?
    };

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, body.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}
