//! Error types for every fallible boundary in the service.
//!
//! Model load failures never leave the predictor; they are kept here as a
//! typed value so diagnostics can tell "not trained yet" from "bundle is
//! broken". Everything else propagates to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Why a scoring model could not be loaded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The model directory does not exist. Normal before the first training run.
    #[error("no trained model at {}", .0.display())]
    NotFound(PathBuf),
    /// The directory exists but its bundle cannot be used.
    #[error("model bundle at {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Failures from the zone, weather and subscription stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] postgres::Error),
    #[error("schema not initialised: missing table {0}")]
    MissingTable(String),
    /// The backing store cannot answer (offline, or a poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failures of a training run. Nothing is persisted when one is returned.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("no weather readings available to train on")]
    NoTrainingData,
    /// The fit produced parameters the model store would refuse to load.
    #[error("training produced an unusable model: {0}")]
    Diverged(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to save model to {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model reload after training failed: {0}")]
    Reload(ModelError),
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Weather API failures.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(u16),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A notification channel could not deliver a message.
#[derive(Debug, Error)]
#[error("{channel} delivery to {recipient} failed: {reason}")]
pub struct DeliveryError {
    pub channel: &'static str,
    pub recipient: String,
    pub reason: String,
}

/// Failures that abort a notification run.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("prediction failed: {0}")]
    Prediction(#[source] StoreError),
    #[error("subscription lookup failed: {0}")]
    Subscriptions(#[source] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_errors_are_distinguishable_in_messages() {
        let missing = ModelError::NotFound(PathBuf::from("model"));
        let corrupt = ModelError::Corrupt {
            path: PathBuf::from("model"),
            reason: "bad json".to_string(),
        };
        assert_eq!(missing.to_string(), "no trained model at model");
        assert_eq!(corrupt.to_string(), "model bundle at model is corrupt: bad json");
        assert_ne!(missing, corrupt);
    }

    #[test]
    fn test_no_training_data_message() {
        assert_eq!(
            TrainError::NoTrainingData.to_string(),
            "no weather readings available to train on"
        );
    }
}
