//! Environment variable handling for config values.
//!
//! `${VAR_NAME}` references inside string values are resolved at load time.
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are matched and `$${VAR}` escapes
//! to a literal `${VAR}`. A small set of `PLUGSMITH_*` variables override
//! individual fields after the file is parsed.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{LoggingConfig, PlugsmithConfig};

/// Matches `${VAR}` and the escaped form `$${VAR}`.
static ENV_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

pub const WORKSPACE_ENV: &str = "PLUGSMITH_WORKSPACE";
pub const TEMPLATES_DIR_ENV: &str = "PLUGSMITH_TEMPLATES_DIR";
pub const LOG_LEVEL_ENV: &str = "PLUGSMITH_LOG";

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config value tree using the process env.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute env vars using a provided map.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute_value(value, env, "")?)
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => substitute_string(s, env, path).map(Value::String),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                out.insert(key.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing = None;
    let replaced = ENV_REF.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(replaced.into_owned()),
    }
}

/// Check whether a string contains an unescaped env var reference.
pub fn contains_env_var_reference(s: &str) -> bool {
    ENV_REF.captures_iter(s).any(|caps| caps[1].is_empty())
}

/// Apply `PLUGSMITH_*` overrides from the process environment.
pub fn apply_env_overrides(config: PlugsmithConfig) -> PlugsmithConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

pub fn apply_env_overrides_with(
    mut config: PlugsmithConfig,
    env: &HashMap<String, String>,
) -> PlugsmithConfig {
    let set = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();

    if let Some(root) = set(WORKSPACE_ENV) {
        config.workspace_root = Some(root);
    }
    if let Some(dir) = set(TEMPLATES_DIR_ENV) {
        config.templates_dir = Some(dir);
    }
    if let Some(level) = set(LOG_LEVEL_ENV) {
        config
            .logging
            .get_or_insert_with(LoggingConfig::default)
            .level = Some(level);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_var() {
        let v = json!({"logging": {"dir": "${HOME_DIR}/logs"}});
        let result = resolve_env_vars_with(&v, &env(&[("HOME_DIR", "/home/me")])).unwrap();
        assert_eq!(result["logging"]["dir"], "/home/me/logs");
    }

    #[test]
    fn error_names_var_and_path() {
        let v = json!({"workspaceRoot": "${NOPE}"});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("NOPE"));
        assert!(err.contains("workspaceRoot"));
    }

    #[test]
    fn escaped_reference_is_kept_literal() {
        let v = json!({"templatesDir": "$${NOT_A_VAR}"});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result["templatesDir"], "${NOT_A_VAR}");
        assert!(!contains_env_var_reference("$${NOT_A_VAR}"));
        assert!(contains_env_var_reference("${REAL}"));
    }

    #[test]
    fn overrides_take_precedence() {
        let cfg = PlugsmithConfig {
            workspace_root: Some("/from/file".into()),
            ..Default::default()
        };
        let cfg = apply_env_overrides_with(
            cfg,
            &env(&[(WORKSPACE_ENV, "/from/env"), (LOG_LEVEL_ENV, "trace")]),
        );
        assert_eq!(cfg.workspace_root.as_deref(), Some("/from/env"));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("trace"));
    }

    #[test]
    fn empty_override_is_ignored() {
        let cfg = PlugsmithConfig {
            templates_dir: Some("tmpl".into()),
            ..Default::default()
        };
        let cfg = apply_env_overrides_with(cfg, &env(&[(TEMPLATES_DIR_ENV, "")]));
        assert_eq!(cfg.templates_dir.as_deref(), Some("tmpl"));
    }
}
