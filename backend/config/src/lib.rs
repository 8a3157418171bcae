//! `plugsmith-config`: workspace configuration for Plugsmith.
//!
//! Provides:
//! - Typed config schema (workspace root, plugin tree, manifest, templates, logging)
//! - YAML/JSON read/write
//! - `${ENV_VAR}` substitution and `PLUGSMITH_*` overrides
//! - Default value application
//! - Validation report
//! - Resolution into a concrete [`WorkspaceLayout`]

pub mod defaults;
pub mod env;
pub mod io;
pub mod layout;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    apply_env_overrides, contains_env_var_reference, resolve_env_vars, resolve_env_vars_with,
    MissingEnvVarError,
};
pub use io::{config_dir, config_file_path, load_config, write_config, CONFIG_FILE_NAME};
pub use layout::WorkspaceLayout;
pub use schema::{LoggingConfig, PlugsmithConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Load, substitute env vars, apply overrides and defaults, then validate.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(path: &Path) -> Result<PlugsmithConfig> {
    let raw_config = load_config(path).await?;

    let value = serde_json::to_value(&raw_config)
        .context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let config: PlugsmithConfig = serde_json::from_value(value)
        .context("Failed to deserialize config after processing")?;

    let config = apply_all_defaults(apply_env_overrides(config));

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if let Some(first) = report.errors.first() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        bail!("{first}");
    }

    Ok(config)
}
