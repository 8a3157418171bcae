//! Config defaults: applies sensible default values to parsed config.

use crate::schema::{LoggingConfig, PlugsmithConfig};

/// Default plugin directory, relative to the workspace root.
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

/// Default manifest location, relative to the workspace root.
pub const DEFAULT_MANIFEST_PATH: &str = ".plugsmith/plugins.json";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: PlugsmithConfig) -> PlugsmithConfig {
    let config = apply_layout_defaults(config);
    apply_logging_defaults(config)
}

fn apply_layout_defaults(mut config: PlugsmithConfig) -> PlugsmithConfig {
    if config.plugins_dir.is_none() {
        config.plugins_dir = Some(DEFAULT_PLUGINS_DIR.to_string());
    }
    if config.manifest_path.is_none() {
        config.manifest_path = Some(DEFAULT_MANIFEST_PATH.to_string());
    }
    config
}

fn apply_logging_defaults(mut config: PlugsmithConfig) -> PlugsmithConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_layout() {
        let cfg = apply_all_defaults(PlugsmithConfig::default());
        assert_eq!(cfg.plugins_dir.as_deref(), Some(DEFAULT_PLUGINS_DIR));
        assert_eq!(cfg.manifest_path.as_deref(), Some(DEFAULT_MANIFEST_PATH));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
    }

    #[test]
    fn does_not_override_user_values() {
        let cfg = PlugsmithConfig {
            plugins_dir: Some("extensions".into()),
            logging: Some(LoggingConfig {
                level: Some("debug".into()),
                dir: None,
            }),
            ..Default::default()
        };
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.plugins_dir.as_deref(), Some("extensions"));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("debug"));
    }
}
