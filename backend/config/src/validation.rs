//! Config validation: field-level checks with user-friendly messages.

use crate::schema::PlugsmithConfig;
use std::path::Path;
use thiserror::Error;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &PlugsmithConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_workspace(config, &mut report);
    validate_layout(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_workspace(config: &PlugsmithConfig, report: &mut ValidationReport) {
    match config.workspace_root.as_deref() {
        None => report.warn(
            "workspaceRoot",
            "No workspace root configured; the current directory will be used",
        ),
        Some(root) if root.trim().is_empty() => {
            report.error("workspaceRoot", "workspaceRoot cannot be empty")
        }
        Some(_) => {}
    }
}

/// Layout paths are joined onto the workspace root, so they must stay relative.
fn validate_layout(config: &PlugsmithConfig, report: &mut ValidationReport) {
    for (field, value) in [
        ("pluginsDir", config.plugins_dir.as_deref()),
        ("manifestPath", config.manifest_path.as_deref()),
    ] {
        let Some(value) = value else { continue };
        if value.trim().is_empty() {
            report.error(field, format!("{field} cannot be empty"));
        } else if Path::new(value).is_absolute() {
            report.error(field, format!("{field} must be relative to the workspace root"));
        }
    }

    if let Some(manifest) = config.manifest_path.as_deref() {
        if !manifest.ends_with(".json") {
            report.warn("manifestPath", "Manifest is always written as JSON; consider a .json extension");
        }
    }

    if let Some(dir) = config.templates_dir.as_deref() {
        if dir.trim().is_empty() {
            report.error("templatesDir", "templatesDir cannot be empty; omit it to use built-in templates");
        }
    }
}

fn validate_logging(config: &PlugsmithConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else {
        return;
    };
    if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        report.error(
            "logging.level",
            format!("Unknown log level '{level}'. Use one of: {}", LOG_LEVELS.join(", ")),
        );
    }
}
