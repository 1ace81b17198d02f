/// Risk scoring.
///
/// A prediction is scored by exactly one of two strategies: the trained
/// model when one could be loaded, or the fixed heuristic otherwise. Which
/// one applies is decided once by the predictor and handed to `score`.
///
/// Submodules:
/// - `heuristic` — the deterministic fallback formula.
/// - `logistic`  — the trained model.

pub mod heuristic;
pub mod logistic;

use std::fmt;
use std::sync::Arc;

use crate::model::FeatureVector;

pub use self::heuristic::heuristic_score;
pub use self::logistic::ScoringModel;

#[derive(Debug, Clone)]
pub enum ScoringStrategy {
    ModelBacked(Arc<ScoringModel>),
    Heuristic,
}

/// Which strategy is active, without the model itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    ModelBacked,
    Heuristic,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::ModelBacked => write!(f, "model"),
            StrategyKind::Heuristic => write!(f, "heuristic"),
        }
    }
}

impl ScoringStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            ScoringStrategy::ModelBacked(_) => StrategyKind::ModelBacked,
            ScoringStrategy::Heuristic => StrategyKind::Heuristic,
        }
    }
}

/// Scores one feature vector. The result is in [0, 1] for both strategies.
pub fn score(strategy: &ScoringStrategy, features: &FeatureVector) -> f64 {
    match strategy {
        ScoringStrategy::ModelBacked(model) => model.predict(features),
        ScoringStrategy::Heuristic => heuristic_score(features),
    }
}
