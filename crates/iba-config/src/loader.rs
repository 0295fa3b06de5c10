//! Config file discovery and layered loading.
//!
//! `load()` runs these steps in order:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `~/.iba/config.toml` (user)
//! 3. Merge the explicit file, if one was given
//! 4. Apply `IBA_*` env var fallbacks for fields no file set
//! 5. Resolve `${VAR}` references
//! 6. Deserialize merged tree → `Config`
//! 7. Validate

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars, resolve_env_references};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration together with where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final validated configuration.
    pub config: Config,
    /// Dotted field path to the layer that set it.
    pub field_sources: FieldSources,
    /// Files that were found and merged, in merge order.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// Which layer set `field` (e.g. `"validator.drift_threshold"`).
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<&ConfigLayer> {
        self.field_sources.get(field)
    }
}

/// Load the configuration with layered precedence.
///
/// `home_override` is treated as the `.iba` directory itself, bypassing home
/// directory discovery.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(file: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();

    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    let user_path = match home_override {
        Some(dir) => dir.join("config.toml"),
        None => home_directory()?.join(".iba").join("config.toml"),
    };
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::User,
            &mut field_sources,
        );
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    if let Some(path) = file {
        // An explicitly named file must exist.
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::File,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, &env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    resolve_env_references(&mut merged, &env_vars);
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering).
///
/// Missing sections take their [`Default`] values.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;

    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if it doesn't exist.
///
/// Reads once and checks size afterwards, so there is no stat/read race.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_deserialize_to_default_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_with_empty_home() {
        let home = tempfile::tempdir().unwrap();
        let resolved = load(None, Some(home.path())).unwrap();

        assert!(resolved.loaded_files.is_empty());
        assert_eq!(resolved.config.intent.default_ttl_secs, 3600);
        assert!(matches!(
            resolved.source_of("intent.default_ttl_secs"),
            Some(ConfigLayer::Defaults)
        ));
    }

    #[test]
    fn test_explicit_file_overrides_user() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join("config.toml"),
            "[validator]\ndrift_threshold = 4\ndrift_window = 10\n",
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("iba.toml");
        std::fs::write(&file, "[validator]\ndrift_threshold = 6\n").unwrap();

        let resolved = load(Some(&file), Some(home.path())).unwrap();

        assert_eq!(resolved.config.validator.drift_threshold, 6);
        assert_eq!(resolved.config.validator.drift_window, 10);
        assert_eq!(resolved.loaded_files.len(), 2);
        assert_eq!(
            resolved.source_of("validator.drift_threshold"),
            Some(&ConfigLayer::File)
        );
        assert_eq!(
            resolved.source_of("validator.drift_window"),
            Some(&ConfigLayer::User)
        );
    }

    #[test]
    fn test_limit_rules_replace_defaults() {
        let home = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("iba.toml");
        std::fs::write(
            &file,
            r#"
            [[validator.limit_rules]]
            limit = "max_records"
            actions = ["read"]
            resources = ["patient:*"]
            "#,
        )
        .unwrap();

        let resolved = load(Some(&file), Some(home.path())).unwrap();
        let rules = &resolved.config.validator.limit_rules;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].limit, "max_records");
        assert_eq!(rules[0].resources, vec!["patient:*".to_owned()]);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let home = tempfile::tempdir().unwrap();
        let result = load(Some(Path::new("/nonexistent/iba.toml")), Some(home.path()));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_invalid_merged_config_rejected() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join("config.toml"),
            "[binder]\nalgorithm = \"rot13\"\n",
        )
        .unwrap();

        let result = load(None, Some(home.path()));
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.toml");
        std::fs::write(&file, "[validator\n").unwrap();

        assert!(matches!(
            load_file(&file),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.toml");
        let padding = "#".repeat(usize::try_from(MAX_CONFIG_FILE_SIZE).unwrap() + 1);
        std::fs::write(&file, padding).unwrap();

        assert!(matches!(
            try_load_file(&file),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_load_file_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("partial.toml");
        std::fs::write(&file, "[binder]\nalgorithm = \"ed25519\"\n").unwrap();

        let config = load_file(&file).unwrap();
        assert_eq!(config.binder.algorithm, "ed25519");
        assert_eq!(config.binder.key_id, "default");
        assert_eq!(config.validator.drift_threshold, 3);
    }

    #[test]
    fn test_try_load_file_missing() {
        assert!(
            try_load_file(Path::new("/nonexistent/config.toml"))
                .unwrap()
                .is_none()
        );
    }
}
