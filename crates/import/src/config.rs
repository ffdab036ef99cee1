use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TOLERANCE_HOURS: i64 = 48;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid reconciliation config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Tolerance must be a positive number of hours that fits a duration, got {0}")]
    InvalidTolerance(i64),
}

/// Settings for one reconciliation run. Owned by the caller and passed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    pub tolerance_hours: i64,
    pub match_payment_method: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tolerance_hours: DEFAULT_TOLERANCE_HOURS,
            match_payment_method: false,
        }
    }
}

impl ReconcileConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: ReconcileConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(path = %path.display(), ?config, "Loaded reconciliation config");
        Ok(config)
    }

    pub fn with_tolerance_hours(mut self, hours: i64) -> Result<Self, ConfigError> {
        self.tolerance_hours = hours;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tolerance_hours <= 0 || Duration::try_hours(self.tolerance_hours).is_none() {
            return Err(ConfigError::InvalidTolerance(self.tolerance_hours));
        }
        Ok(())
    }

    /// Saturates for values [`ReconcileConfig::validate`] would reject.
    pub fn tolerance(&self) -> Duration {
        Duration::try_hours(self.tolerance_hours).unwrap_or(Duration::MAX)
    }
}
