//! Risk threshold checking.
//!
//! A zone is in breach when its predicted score is at or above the
//! configured threshold. The notifier only ever sees breaching predictions.

use crate::error::ConfigError;
use crate::model::Prediction;

/// Alert threshold, guaranteed to lie within [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThreshold(f64);

impl RiskThreshold {
    pub const DEFAULT: f64 = 0.7;

    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(RiskThreshold(value))
        } else {
            Err(ConfigError::Invalid {
                key: "notification.threshold",
                reason: format!("{} is outside [0, 1]", value),
            })
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Inclusive: a score exactly at the threshold is a breach.
    pub fn is_breached_by(&self, score: f64) -> bool {
        score >= self.0
    }
}

impl Default for RiskThreshold {
    fn default() -> Self {
        RiskThreshold(Self::DEFAULT)
    }
}

/// Returns the predictions at or above `threshold`, in their original order.
pub fn breaches(predictions: &[Prediction], threshold: RiskThreshold) -> Vec<&Prediction> {
    predictions
        .iter()
        .filter(|p| threshold.is_breached_by(p.score))
        .collect()
}
