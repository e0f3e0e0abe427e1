//! Store configuration.
//!
//! A store is a root directory plus the file name used for each directory's
//! audit log. Values come from presets, explicit arguments, or the
//! environment:
//!
//! - `SNAPVAULT_ROOT`: root directory (default `data/01_raw`)
//! - `SNAPVAULT_LOG_NAME`: log file name (default `log.json`)

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Root of the raw-capture store.
pub const RAW_DATA_ROOT: &str = "data/01_raw";
/// Log name used in the raw-capture store.
pub const RAW_DATA_LOG_NAME: &str = "raw_data_log.json";
/// Root of the intermediate (transformed) store.
pub const INTERMEDIATE_DATA_ROOT: &str = "data/02_intermediate";
/// Default log name.
pub const DEFAULT_LOG_NAME: &str = "log.json";

/// Errors from loading or validating a [`StoreConfig`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("store root must not be empty")]
    EmptyRoot,

    #[error("invalid log name {name:?}: {reason}")]
    InvalidLogName { name: String, reason: &'static str },
}

/// Where a store lives and what its logs are called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub log_name: String,
}

impl StoreConfig {
    /// Validated configuration.
    pub fn new(root: impl Into<PathBuf>, log_name: impl Into<String>) -> Result<Self, ConfigError> {
        let root = root.into();
        let log_name = log_name.into();
        if root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRoot);
        }
        validate_log_name(&log_name)?;
        Ok(Self { root, log_name })
    }

    /// The raw-capture store: `data/01_raw` with `raw_data_log.json`.
    pub fn raw() -> Self {
        Self {
            root: PathBuf::from(RAW_DATA_ROOT),
            log_name: RAW_DATA_LOG_NAME.to_string(),
        }
    }

    /// The intermediate store: `data/02_intermediate` with `log.json`.
    pub fn intermediate() -> Self {
        Self {
            root: PathBuf::from(INTERMEDIATE_DATA_ROOT),
            log_name: DEFAULT_LOG_NAME.to_string(),
        }
    }

    /// Load from `SNAPVAULT_ROOT` and `SNAPVAULT_LOG_NAME`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::layered(None, None, lookup)
    }

    /// Explicit values first, then `lookup`, then defaults. Only the merged
    /// result is validated, so an overridden variable may hold anything.
    pub fn layered(
        root: Option<PathBuf>,
        log_name: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let root = root
            .or_else(|| lookup("SNAPVAULT_ROOT").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(RAW_DATA_ROOT));
        let log_name = log_name
            .or_else(|| lookup("SNAPVAULT_LOG_NAME"))
            .unwrap_or_else(|| DEFAULT_LOG_NAME.to_string());
        Self::new(root, log_name)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn validate_log_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidLogName {
        name: name.to_string(),
        reason,
    };
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("must be a bare file name"));
    }
    match name.strip_suffix(".json") {
        Some(stem) if !stem.is_empty() && !stem.starts_with('.') => Ok(()),
        Some(_) => Err(invalid("stem must be non-empty and not hidden")),
        None => Err(invalid("must end in .json")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_env_is_empty() {
        let cfg = StoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.root, PathBuf::from("data/01_raw"));
        assert_eq!(cfg.log_name, "log.json");
    }

    #[test]
    fn reads_overrides() {
        let env: HashMap<&str, &str> = [
            ("SNAPVAULT_ROOT", "/srv/vault"),
            ("SNAPVAULT_LOG_NAME", "raw_data_log.json"),
        ]
        .into_iter()
        .collect();
        let cfg = StoreConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.root(), Path::new("/srv/vault"));
        assert_eq!(cfg.log_name, "raw_data_log.json");
    }

    #[test]
    fn explicit_values_shadow_invalid_env() {
        let env = |k: &str| (k == "SNAPVAULT_LOG_NAME").then(|| "bad.txt".to_string());
        assert!(StoreConfig::from_lookup(env).is_err());

        let cfg = StoreConfig::layered(None, Some("log.json".into()), env).unwrap();
        assert_eq!(cfg.log_name, "log.json");
        assert_eq!(cfg.root, PathBuf::from("data/01_raw"));

        let err = StoreConfig::layered(Some("/srv".into()), None, env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogName { .. }));
    }

    #[test]
    fn presets_match_pipeline_layout() {
        assert_eq!(StoreConfig::raw().log_name, "raw_data_log.json");
        assert_eq!(StoreConfig::intermediate().root, PathBuf::from("data/02_intermediate"));
    }

    #[test]
    fn rejects_bad_log_names() {
        for bad in ["log.txt", "logs/log.json", ".json", ".hidden.json", "log"] {
            assert!(
                matches!(
                    StoreConfig::new("data", bad),
                    Err(ConfigError::InvalidLogName { .. })
                ),
                "{bad} should be rejected"
            );
        }
        assert_eq!(StoreConfig::new("", "log.json"), Err(ConfigError::EmptyRoot));
    }
}
