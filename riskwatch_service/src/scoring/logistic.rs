//! Trained scoring model: logistic regression over standardized features.
//!
//! Output is sigmoid-bounded, so every score already lies in [0, 1]. The
//! standardization parameters travel with the weights so a reloaded model
//! scores exactly like the one that was trained.

use chrono::{DateTime, Utc};

use crate::model::{FeatureVector, FEATURE_COUNT};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringModel {
    pub(crate) feature_means: [f64; FEATURE_COUNT],
    pub(crate) feature_scales: [f64; FEATURE_COUNT],
    pub(crate) weights: [f64; FEATURE_COUNT],
    pub(crate) bias: f64,
    pub(crate) trained_at: DateTime<Utc>,
    pub(crate) sample_count: usize,
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl ScoringModel {
    pub fn new(
        feature_means: [f64; FEATURE_COUNT],
        feature_scales: [f64; FEATURE_COUNT],
        weights: [f64; FEATURE_COUNT],
        bias: f64,
        trained_at: DateTime<Utc>,
        sample_count: usize,
    ) -> Self {
        Self {
            feature_means,
            feature_scales,
            weights,
            bias,
            trained_at,
            sample_count,
        }
    }

    /// Maps raw features onto the scale the weights were fitted on.
    pub fn standardize(&self, features: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut scaled = [0.0; FEATURE_COUNT];
        for (i, value) in features.0.iter().enumerate() {
            scaled[i] = (value - self.feature_means[i]) / self.feature_scales[i];
        }
        scaled
    }

    /// Risk score in [0, 1]. Inputs that drive the logit to NaN score 0.
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let scaled = self.standardize(features);
        let z = self.bias
            + self
                .weights
                .iter()
                .zip(scaled.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>();
        let p = sigmoid(z);
        if p.is_nan() {
            0.0
        } else {
            p.clamp(0.0, 1.0)
        }
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn weights(&self) -> &[f64; FEATURE_COUNT] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// True when every parameter is usable: finite values and non-zero scales.
    pub fn is_well_formed(&self) -> bool {
        self.feature_means.iter().all(|v| v.is_finite())
            && self.feature_scales.iter().all(|v| v.is_finite() && *v != 0.0)
            && self.weights.iter().all(|v| v.is_finite())
            && self.bias.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn model(weights: [f64; 3], bias: f64) -> ScoringModel {
        ScoringModel::new(
            [20.0, 50.0, 10.0],
            [5.0, 20.0, 8.0],
            weights,
            bias,
            Utc.with_ymd_and_hms(2025, 6, 12, 0, 0, 0).unwrap(),
            10,
        )
    }

    #[test]
    fn test_sigmoid_midpoint_and_tails() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(40.0) > 0.999_999);
        assert!(sigmoid(-40.0) < 0.000_001);
    }

    #[test]
    fn test_zero_weights_score_sigmoid_of_bias() {
        let m = model([0.0, 0.0, 0.0], 0.0);
        assert_eq!(m.predict(&FeatureVector::new(99.0, 1.0, 40.0)), 0.5);
    }

    #[test]
    fn test_features_at_mean_score_sigmoid_of_bias() {
        let m = model([1.0, -2.0, 3.0], 1.5);
        let score = m.predict(&FeatureVector::new(20.0, 50.0, 10.0));
        assert!((score - sigmoid(1.5)).abs() < 1e-12);
    }

    #[test]
    fn test_extreme_inputs_stay_in_unit_interval() {
        let m = model([0.0, -5.0, 5.0], 0.0);
        let high = m.predict(&FeatureVector::new(0.0, -1e6, 1e6));
        let low = m.predict(&FeatureVector::new(0.0, 1e6, -1e6));
        assert!((0.0..=1.0).contains(&high));
        assert!((0.0..=1.0).contains(&low));
        assert!(high > low);
    }

    #[test]
    fn test_nan_feature_still_scores_in_unit_interval() {
        let m = model([0.5, -1.0, 2.0], 0.2);
        let score = m.predict(&FeatureVector::new(20.0, f64::NAN, 0.0));
        assert!((0.0..=1.0).contains(&score), "score was {}", score);
    }

    #[test]
    fn test_well_formed_rejects_zero_scale_and_nan() {
        let mut m = model([1.0, 1.0, 1.0], 0.0);
        assert!(m.is_well_formed());
        m.feature_scales[1] = 0.0;
        assert!(!m.is_well_formed());
        m.feature_scales[1] = 1.0;
        m.bias = f64::NAN;
        assert!(!m.is_well_formed());
    }
}
