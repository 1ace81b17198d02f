//! Fallback risk formula used whenever no trained model is available.
//!
//! Notification thresholds were tuned against these exact constants, so
//! they must not change: stronger wind and drier air mean higher risk.

use crate::model::FeatureVector;

/// Wind speed treated as the top of the scale.
pub const WIND_NORMALIZATION: f64 = 40.0;
pub const WIND_WEIGHT: f64 = 0.7;
pub const HUMIDITY_WEIGHT: f64 = 0.3;

/// `min(1, 0.7 * wind / 40 + 0.3 * (100 - humidity) / 100)`, floored at 0.
///
/// The floor only matters for readings outside physical range (humidity
/// above 100 with near-zero wind); for every valid reading the result is
/// the capped weighted sum. A NaN input scores 0 rather than the cap.
pub fn heuristic_score(features: &FeatureVector) -> f64 {
    let wind_factor = features.wind_speed() / WIND_NORMALIZATION;
    let humidity_factor = (100.0 - features.humidity()) / 100.0;
    let raw = wind_factor * WIND_WEIGHT + humidity_factor * HUMIDITY_WEIGHT;
    if raw.is_nan() {
        return 0.0;
    }
    raw.min(1.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_windy_dry_zone_scores_point_seven() {
        // wind 28/40 = 0.7, humidity (100-30)/100 = 0.7 -> 0.49 + 0.21
        let score = heuristic_score(&FeatureVector::new(20.0, 30.0, 28.0));
        assert!((score - 0.70).abs() < EPSILON, "expected 0.70, got {}", score);
    }

    #[test]
    fn test_calm_saturated_zone_scores_zero() {
        let score = heuristic_score(&FeatureVector::new(20.0, 100.0, 0.0));
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_score_is_capped_at_one() {
        let score = heuristic_score(&FeatureVector::new(35.0, 0.0, 120.0));
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_temperature_does_not_affect_heuristic() {
        let cold = heuristic_score(&FeatureVector::new(-10.0, 40.0, 12.0));
        let hot = heuristic_score(&FeatureVector::new(45.0, 40.0, 12.0));
        assert_eq!(cold, hot);
    }

    #[test]
    fn test_all_zero_features_score_humidity_term_only() {
        // No reading fields at all still gives the dry-air contribution.
        let score = heuristic_score(&FeatureVector::new(0.0, 0.0, 0.0));
        assert!((score - 0.3).abs() < EPSILON);
    }

    #[test]
    fn test_out_of_range_humidity_is_floored() {
        let score = heuristic_score(&FeatureVector::new(20.0, 250.0, 0.0));
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_nan_features_do_not_score_maximum_risk() {
        let score = heuristic_score(&FeatureVector::new(20.0, f64::NAN, 0.0));
        assert_eq!(score, 0.0);
    }

    proptest! {
        #[test]
        fn prop_score_within_unit_interval(
            temperature in -60.0f64..60.0,
            humidity in 0.0f64..=100.0,
            wind in 0.0f64..200.0,
        ) {
            let score = heuristic_score(&FeatureVector::new(temperature, humidity, wind));
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn prop_identical_features_give_identical_bits(
            temperature in -60.0f64..60.0,
            humidity in 0.0f64..=100.0,
            wind in 0.0f64..200.0,
        ) {
            let features = FeatureVector::new(temperature, humidity, wind);
            let first = heuristic_score(&features);
            let second = heuristic_score(&features);
            prop_assert_eq!(first.to_bits(), second.to_bits());
        }

        #[test]
        fn prop_more_wind_never_lowers_risk(
            humidity in 0.0f64..=100.0,
            wind in 0.0f64..100.0,
            extra in 0.0f64..100.0,
        ) {
            let base = heuristic_score(&FeatureVector::new(20.0, humidity, wind));
            let windier = heuristic_score(&FeatureVector::new(20.0, humidity, wind + extra));
            prop_assert!(windier >= base);
        }
    }
}
