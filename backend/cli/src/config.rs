use anyhow::Result;
use std::path::{Path, PathBuf};

use plugsmith_config::{config_dir, config_file_path, load_and_prepare, PlugsmithConfig, CONFIG_FILE_NAME};

/// Config file to load: `--config`, else `plugsmith.yaml` in the workspace
/// (or the current directory), else the user-level config file.
pub fn locate(explicit: Option<&Path>, workspace: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = workspace.unwrap_or_else(|| Path::new(".")).join(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    config_file_path(&config_dir())
}

/// Load the prepared config. `--workspace` beats both the file and
/// `PLUGSMITH_WORKSPACE`.
pub async fn resolve(explicit: Option<&Path>, workspace: Option<&Path>) -> Result<PlugsmithConfig> {
    let path = locate(explicit, workspace);
    let mut config = load_and_prepare(&path).await?;
    if let Some(workspace) = workspace {
        config.workspace_root = Some(workspace.display().to_string());
    }
    Ok(config)
}

pub fn log_level(config: &PlugsmithConfig) -> &str {
    config
        .logging
        .as_ref()
        .and_then(|l| l.level.as_deref())
        .unwrap_or("info")
}

pub fn log_dir(config: &PlugsmithConfig) -> Option<PathBuf> {
    config
        .logging
        .as_ref()
        .and_then(|l| l.dir.as_deref())
        .map(PathBuf::from)
}
