//! Service configuration.
//!
//! Settings come from an optional TOML file (`riskwatch.toml` by default)
//! and are then overridden by environment variables, with `.env` loaded
//! first. Every section and key is optional; the defaults describe a local
//! development setup with the model bundle under `./model`.
//!
//! ```toml
//! [database]
//! url = "postgres://riskwatch@localhost/riskwatch"
//!
//! [model]
//! dir = "model"
//!
//! [notification]
//! threshold = 0.7
//!
//! [training]
//! epochs = 500
//! learning_rate = 0.1
//!
//! [weather]
//! api_key = "..."
//! interval_minutes = 30
//!
//! [logging]
//! level = "info"
//! file = "riskwatch.log"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alert::thresholds::RiskThreshold;
use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "riskwatch.toml";

const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding the trained bundle. Its absence means "not trained".
    pub dir: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("model") }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Minimum score that triggers an alert, within [0, 1].
    pub threshold: f64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { threshold: RiskThreshold::DEFAULT }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 500,
            learning_rate: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Polling interval of the `run` daemon.
    pub interval_minutes: u64,
}

impl WeatherConfig {
    /// Sleep between daemon passes. `override_minutes` comes from the
    /// command line; zero is raised to one minute and huge values saturate.
    pub fn poll_interval(&self, override_minutes: Option<u64>) -> Duration {
        let minutes = override_minutes.unwrap_or(self.interval_minutes).max(1);
        Duration::from_secs(minutes.saturating_mul(60))
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: OPENWEATHER_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 30,
            interval_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub notification: NotificationConfig,
    pub training: TrainingConfig,
    pub weather: WeatherConfig,
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Loads `.env`, the TOML file, then environment overrides.
    ///
    /// An explicitly given path must exist. Without one, a missing
    /// `riskwatch.toml` just means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies environment-style overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(dir) = lookup("MODEL_DIR") {
            self.model.dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("NOTIFICATION_THRESHOLD") {
            self.notification.threshold = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "NOTIFICATION_THRESHOLD",
                reason: format!("'{}' is not a number", raw),
            })?;
        }
        if let Some(key) = lookup("OPENWEATHER_API_KEY") {
            self.weather.api_key = Some(key);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(file) = lookup("LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.threshold()?;
        if self.training.epochs == 0 {
            return Err(ConfigError::Invalid {
                key: "training.epochs",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.training.learning_rate.is_finite() && self.training.learning_rate > 0.0) {
            return Err(ConfigError::Invalid {
                key: "training.learning_rate",
                reason: format!("{} is not a positive number", self.training.learning_rate),
            });
        }
        if self.weather.interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                key: "weather.interval_minutes",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn threshold(&self) -> Result<RiskThreshold, ConfigError> {
        RiskThreshold::new(self.notification.threshold)
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database.url.as_deref().ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    pub fn weather_api_key(&self) -> Result<&str, ConfigError> {
        self.weather.api_key.as_deref().ok_or(ConfigError::Missing("OPENWEATHER_API_KEY"))
    }
}
