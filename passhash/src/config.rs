//! Configuration loader. Settings come from an optional JSON file, with the
//! cost factor overridable from the environment so deployments can raise it
//! without touching the file.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::hasher::{COST_RANGE, DEFAULT_COST};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "PASSHASH_CONFIG";
/// Config file used when `PASSHASH_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "passhash.json";
/// Environment variable overriding the configured cost.
pub const COST_ENV: &str = "PASSHASH_COST";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("cost factor {0} outside the accepted range 4..=31")]
    InvalidCost(u32),
    #[error("environment override {var} is not a number: {value:?}")]
    Env { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasherConfig {
    /// Cost used when a caller does not pass one explicitly.
    #[serde(default = "default_cost")]
    pub cost: u32,
    #[serde(rename = "debugLevel", default, skip_serializing_if = "Option::is_none")]
    pub debug_level: Option<String>,
}

fn default_cost() -> u32 {
    DEFAULT_COST
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            cost: DEFAULT_COST,
            debug_level: None,
        }
    }
}

impl HasherConfig {
    fn validate(self) -> Result<Self, ConfigError> {
        if COST_RANGE.contains(&self.cost) {
            Ok(self)
        } else {
            Err(ConfigError::InvalidCost(self.cost))
        }
    }

    fn apply_cost_override(mut self, value: Option<String>) -> Result<Self, ConfigError> {
        if let Some(raw) = value {
            self.cost = raw.trim().parse().map_err(|_| ConfigError::Env {
                var: COST_ENV,
                value: raw.clone(),
            })?;
        }
        Ok(self)
    }
}

/// Parses configuration JSON and validates it.
pub fn parse_config(raw_json: &str) -> Result<HasherConfig, ConfigError> {
    let config: HasherConfig =
        serde_json::from_str(raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))?;
    config.validate()
}

/// Reads the file at `path`. A missing file yields the defaults; any other
/// read failure is an error.
pub fn load_file(path: impl AsRef<Path>) -> Result<HasherConfig, ConfigError> {
    match fs::read_to_string(path.as_ref()) {
        Ok(raw_json) => parse_config(&raw_json),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(HasherConfig::default()),
        Err(e) => Err(ConfigError::Io(format!("{e}"))),
    }
}

/// Loads the file named by `PASSHASH_CONFIG` (or `passhash.json`) and applies
/// the `PASSHASH_COST` override.
pub fn load_config() -> Result<HasherConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_file(path)?
        .apply_cost_override(std::env::var(COST_ENV).ok())?
        .validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_file(dir.path().join("absent.json")).expect("defaults");
        assert_eq!(config, HasherConfig::default());
        assert_eq!(config.cost, 10);
    }

    #[test]
    fn loads_values_from_file() {
        let payload = json!({ "cost": 12, "debugLevel": "debug" });
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), serde_json::to_vec(&payload).unwrap()).unwrap();

        let config = load_file(file.path()).expect("config should load");
        assert_eq!(config.cost, 12);
        assert_eq!(config.debug_level.as_deref(), Some("debug"));
    }

    #[test]
    fn absent_fields_fall_back() {
        let config = parse_config("{}").expect("empty object is valid");
        assert_eq!(config, HasherConfig::default());
    }

    #[test]
    fn rejects_out_of_range_cost() {
        let err = parse_config(r#"{"cost": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCost(3)));
        let err = parse_config(r#"{"cost": 32}"#).unwrap_err();
        assert!(format!("{err}").contains("outside the accepted range"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_config("{cost: 12").unwrap_err();
        assert!(format!("{err}").contains("config parse failed"));
    }

    #[test]
    fn environment_overrides_cost() {
        let config = HasherConfig::default()
            .apply_cost_override(Some(" 13 ".to_string()))
            .and_then(HasherConfig::validate)
            .expect("override applies");
        assert_eq!(config.cost, 13);

        let err = HasherConfig::default()
            .apply_cost_override(Some("high".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: COST_ENV, .. }));

        let err = HasherConfig::default()
            .apply_cost_override(Some("40".to_string()))
            .and_then(HasherConfig::validate)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCost(40)));
    }

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Sets config variables for one test and clears them again on drop,
    /// including when an assertion panics.
    struct EnvVars<'a> {
        _lock: MutexGuard<'a, ()>,
    }

    impl EnvVars<'_> {
        fn set(path: &Path, cost: Option<&str>) -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            std::env::set_var(CONFIG_PATH_ENV, path);
            match cost {
                Some(value) => std::env::set_var(COST_ENV, value),
                None => std::env::remove_var(COST_ENV),
            }
            Self { _lock: lock }
        }
    }

    impl Drop for EnvVars<'_> {
        fn drop(&mut self) {
            std::env::remove_var(CONFIG_PATH_ENV);
            std::env::remove_var(COST_ENV);
        }
    }

    #[test]
    fn load_config_reads_env_selected_file() {
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), br#"{"cost": 11}"#).unwrap();
        let _env = EnvVars::set(file.path(), None);

        let config = load_config().expect("config should load");
        assert_eq!(config.cost, 11);
    }

    #[test]
    fn load_config_fails_on_malformed_cost_override() {
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), br#"{"cost": 11}"#).unwrap();
        let _env = EnvVars::set(file.path(), Some("1 4"));

        let err = load_config().unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: COST_ENV, ref value } if value == "1 4"));
    }

    #[test]
    fn load_config_fails_on_invalid_file() {
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), br#"{"cost": "high"}"#).unwrap();
        let _env = EnvVars::set(file.path(), None);

        assert!(matches!(load_config(), Err(ConfigError::Parse(_))));
    }
}
