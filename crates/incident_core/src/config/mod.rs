use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analytics::{DEFAULT_FRESH_ALERT_SECS, DEFAULT_TIMELINE_DAYS, MAX_TIMELINE_DAYS};
use crate::error::AppError;
use crate::persist::STORAGE_KEY;

pub const ENV_DB_PATH: &str = "INCIDENTDASH_DB";
pub const ENV_SEED: &str = "INCIDENTDASH_SEED";
pub const ENV_BACKEND: &str = "INCIDENTDASH_BACKEND";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Dashboard settings. Every field has a default, so an empty JSON object is a valid file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// SQLite file holding the storage slots.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Load the demo incidents when storage is empty.
    #[serde(default)]
    pub seed_demo_when_empty: bool,

    #[serde(default = "default_timeline_days")]
    pub timeline_days: u32,

    #[serde(default = "default_fresh_alert_secs")]
    pub fresh_alert_secs: i64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("incidentdash.sqlite")
}

fn default_storage_key() -> String {
    STORAGE_KEY.to_string()
}

fn default_timeline_days() -> u32 {
    DEFAULT_TIMELINE_DAYS
}

fn default_fresh_alert_secs() -> i64 {
    DEFAULT_FRESH_ALERT_SECS
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            db_path: default_db_path(),
            storage_key: default_storage_key(),
            seed_demo_when_empty: false,
            timeline_days: default_timeline_days(),
            fresh_alert_secs: default_fresh_alert_secs(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json_str(text: &str) -> Result<Self, AppError> {
        serde_json::from_str(text).map_err(|e| {
            AppError::new("CONFIG_PARSE_FAILED", "Failed to parse configuration")
                .with_details(e.to_string())
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to read configuration file")
                .with_details(format!("path={}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Optional file, then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let vars: HashMap<String, String> = std::env::vars().collect();
        let config = base.with_env_overrides(&vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self, vars: &HashMap<String, String>) -> Result<Self, AppError> {
        if let Some(db) = vars.get(ENV_DB_PATH).filter(|v| !v.trim().is_empty()) {
            self.db_path = PathBuf::from(db);
        }
        if let Some(seed) = vars.get(ENV_SEED) {
            self.seed_demo_when_empty = match seed.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => {
                    return Err(AppError::new(
                        "CONFIG_INVALID_VALUE",
                        format!("Invalid boolean for {ENV_SEED}"),
                    )
                    .with_details(format!("value={other}")))
                }
            };
        }
        if let Some(backend) = vars.get(ENV_BACKEND) {
            self.backend = match backend.trim().to_lowercase().as_str() {
                "sqlite" => StorageBackend::Sqlite,
                "memory" => StorageBackend::Memory,
                other => {
                    return Err(AppError::new(
                        "CONFIG_INVALID_VALUE",
                        format!("Invalid storage backend for {ENV_BACKEND}"),
                    )
                    .with_details(format!("value={other}")))
                }
            };
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.storage_key.trim().is_empty() {
            return Err(AppError::new(
                "CONFIG_INVALID_VALUE",
                "storage_key must not be empty",
            ));
        }
        if self.timeline_days == 0 || self.timeline_days > MAX_TIMELINE_DAYS {
            return Err(AppError::new(
                "CONFIG_INVALID_VALUE",
                format!("timeline_days must be between 1 and {MAX_TIMELINE_DAYS}"),
            )
            .with_details(format!("value={}", self.timeline_days)));
        }
        if self.fresh_alert_secs <= 0 {
            return Err(AppError::new(
                "CONFIG_INVALID_VALUE",
                "fresh_alert_secs must be positive",
            )
            .with_details(format!("value={}", self.fresh_alert_secs)));
        }
        if self.backend == StorageBackend::Sqlite && self.db_path.as_os_str().is_empty() {
            return Err(AppError::new(
                "CONFIG_INVALID_VALUE",
                "db_path must not be empty for the sqlite backend",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = DashboardConfig::from_json_str("{}").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.storage_key, "incidents_data_v1");
        assert_eq!(config.timeline_days, 7);
    }

    #[test]
    fn env_overrides_apply() {
        let vars = HashMap::from([
            (ENV_DB_PATH.to_string(), "/tmp/x.sqlite".to_string()),
            (ENV_SEED.to_string(), "yes".to_string()),
            (ENV_BACKEND.to_string(), "memory".to_string()),
        ]);
        let config = DashboardConfig::default().with_env_overrides(&vars).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.sqlite"));
        assert!(config.seed_demo_when_empty);
        assert_eq!(config.backend, StorageBackend::Memory);
    }

    #[test]
    fn bad_seed_flag_is_rejected() {
        let vars = HashMap::from([(ENV_SEED.to_string(), "maybe".to_string())]);
        let err = DashboardConfig::default()
            .with_env_overrides(&vars)
            .unwrap_err();
        assert_eq!(err.code, "CONFIG_INVALID_VALUE");
    }

    #[test]
    fn zero_timeline_window_fails_validation() {
        let config = DashboardConfig {
            timeline_days: 0,
            ..DashboardConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().code, "CONFIG_INVALID_VALUE");
    }

    #[test]
    fn oversized_timeline_window_fails_validation() {
        let config = DashboardConfig::from_json_str(r#"{"timeline_days": 4000000000}"#).unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code, "CONFIG_INVALID_VALUE");
        assert_eq!(err.details.as_deref(), Some("value=4000000000"));

        let year = DashboardConfig {
            timeline_days: MAX_TIMELINE_DAYS,
            ..DashboardConfig::default()
        };
        assert!(year.validate().is_ok());
    }
}
