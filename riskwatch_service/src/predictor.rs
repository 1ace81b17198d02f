/// Risk predictor.
///
/// Produces one `Prediction` per zone from the zone's latest weather
/// reading. Scoring uses the trained model when the model store can load
/// one and the heuristic otherwise.
///
/// # Model lifecycle
/// The load is attempted lazily, at most once, on the first call that
/// needs a score (or eagerly via `warm_up`). Its outcome is memoized in
/// the predictor:
///
///   NotAttempted ──load ok──▶ Loaded(model)
///        │
///        └──────load err───▶ Unavailable(error)
///
/// `Unavailable` is permanent for the life of the predictor. The only way
/// back to `Loaded` is `reload_model` (or `train_and_reload`), typically
/// after an administrator re-trains.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::TrainingConfig;
use crate::error::{ModelError, StoreError, TrainError};
use crate::logging::{self, Component};
use crate::model::{FeatureVector, Prediction, WeatherReading, Zone, ZoneId};
use crate::model_store::ModelStore;
use crate::scoring::{self, ScoringModel, ScoringStrategy, StrategyKind};
use crate::store::{WeatherStore, ZoneStore};
use crate::train::{self, TrainingReport};

/// Memoized outcome of loading the scoring model.
#[derive(Debug, Clone)]
pub enum ModelState {
    NotAttempted,
    Loaded(Arc<ScoringModel>),
    /// The load failed; the error is kept for diagnostics.
    Unavailable(ModelError),
}

impl ModelState {
    fn strategy(&self) -> Option<ScoringStrategy> {
        match self {
            ModelState::NotAttempted => None,
            ModelState::Loaded(model) => Some(ScoringStrategy::ModelBacked(Arc::clone(model))),
            ModelState::Unavailable(_) => Some(ScoringStrategy::Heuristic),
        }
    }
}

/// Builds the prediction for one zone. A zone without any reading scores 0
/// with no timestamp.
pub fn predict_for_zone(
    strategy: &ScoringStrategy,
    zone: &Zone,
    latest: Option<&WeatherReading>,
) -> Prediction {
    match latest {
        Some(reading) => Prediction {
            zone_id: zone.id,
            zone_name: zone.name.clone(),
            score: scoring::score(strategy, &FeatureVector::from_reading(reading)),
            timestamp: Some(reading.timestamp),
        },
        None => Prediction {
            zone_id: zone.id,
            zone_name: zone.name.clone(),
            score: 0.0,
            timestamp: None,
        },
    }
}

pub struct RiskPredictor<S> {
    store: S,
    model_store: ModelStore,
    state: RwLock<ModelState>,
    load_attempts: AtomicUsize,
}

impl<S> RiskPredictor<S>
where
    S: ZoneStore + WeatherStore,
{
    pub fn new(store: S, model_store: ModelStore) -> Self {
        Self {
            store,
            model_store,
            state: RwLock::new(ModelState::NotAttempted),
            load_attempts: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn model_store(&self) -> &ModelStore {
        &self.model_store
    }

    /// Snapshot of the memoized load outcome. Does not trigger a load.
    pub fn model_state(&self) -> ModelState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times the model store has been asked for the model,
    /// counting explicit reloads.
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::SeqCst)
    }

    /// Predictions for the given zone, or for every zone when `zone_id` is
    /// `None`, in store order.
    ///
    /// An unknown `zone_id` yields an empty list. Store failures propagate;
    /// model problems never do.
    pub fn predict(&self, zone_id: Option<ZoneId>) -> Result<Vec<Prediction>, StoreError> {
        let strategy = self.strategy();

        let zones: Vec<Zone> = match zone_id {
            Some(id) => self.store.find_by_id(id)?.into_iter().collect(),
            None => self.store.find_all()?,
        };

        let mut predictions = Vec::with_capacity(zones.len());
        for zone in &zones {
            let latest = self.store.find_latest_for_zone(zone.id)?;
            predictions.push(predict_for_zone(&strategy, zone, latest.as_ref()));
        }

        logging::debug(
            Component::Predictor,
            zone_id,
            &format!("scored {} zone(s) using {}", predictions.len(), strategy.kind()),
        );
        Ok(predictions)
    }

    /// Single-zone convenience: `None` means the zone does not exist.
    pub fn predict_zone(&self, zone_id: ZoneId) -> Result<Option<Prediction>, StoreError> {
        Ok(self.predict(Some(zone_id))?.into_iter().next())
    }

    /// Resolves the scoring strategy now rather than on the first request.
    pub fn warm_up(&self) -> StrategyKind {
        self.strategy().kind()
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy().kind()
    }

    /// Discards the memoized outcome and loads again.
    ///
    /// The new outcome is memoized either way; the error is also returned
    /// so an administrator-triggered reload can report it.
    pub fn reload_model(&self) -> Result<StrategyKind, ModelError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = self.attempt_load();
        match &*state {
            ModelState::Unavailable(err) => Err(err.clone()),
            _ => Ok(StrategyKind::ModelBacked),
        }
    }

    /// Trains on the current store contents, then reloads so subsequent
    /// predictions use the new model.
    pub fn train_and_reload(&self, config: &TrainingConfig) -> Result<TrainingReport, TrainError> {
        let report = train::train_model(&self.store, &self.model_store, config)?;
        self.reload_model().map_err(TrainError::Reload)?;
        Ok(report)
    }

    fn strategy(&self) -> ScoringStrategy {
        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(strategy) = state.strategy() {
                return strategy;
            }
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have finished the load while we waited.
        if matches!(*state, ModelState::NotAttempted) {
            *state = self.attempt_load();
        }
        state.strategy().unwrap_or(ScoringStrategy::Heuristic)
    }

    fn attempt_load(&self) -> ModelState {
        self.load_attempts.fetch_add(1, Ordering::SeqCst);
        match self.model_store.load() {
            Ok(model) => {
                logging::info(
                    Component::ModelStore,
                    None,
                    &format!(
                        "loaded model from {} (trained {}, {} samples)",
                        self.model_store.dir().display(),
                        model.trained_at().to_rfc3339(),
                        model.sample_count()
                    ),
                );
                ModelState::Loaded(Arc::new(model))
            }
            Err(err) => {
                logging::log_model_load_failure(&err);
                ModelState::Unavailable(err)
            }
        }
    }
}
