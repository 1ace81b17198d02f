//! Model training.
//!
//! One training row per stored weather reading, `[temperature, humidity,
//! wind_speed]`, labeled with the owning zone's risk level. The model's
//! output is sigmoid-bounded, so labels are clamped into [0, 1] first.
//!
//! The fit is plain full-batch gradient descent on log-loss over
//! standardized features, starting from zero weights. There is no
//! randomness: the same rows and settings always give the same parameters.
//!
//! Nothing is written unless the fit succeeds and yields a loadable model;
//! an empty data set or a diverged fit leaves any existing bundle in place.

use std::path::PathBuf;

use chrono::Utc;

use crate::config::TrainingConfig;
use crate::error::{StoreError, TrainError};
use crate::logging::{self, Component};
use crate::model::{FeatureVector, FEATURE_COUNT};
use crate::model_store::ModelStore;
use crate::scoring::logistic::sigmoid;
use crate::scoring::ScoringModel;
use crate::store::{WeatherStore, ZoneStore};

/// Smallest standard deviation treated as real spread.
const MIN_SCALE: f64 = 1e-12;

/// Keeps log-loss finite when the model is fully confident.
const LOSS_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub rows: Vec<[f64; FEATURE_COUNT]>,
    pub labels: Vec<f64>,
    /// Zones that contributed at least one row.
    pub zone_count: usize,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub sample_count: usize,
    pub zone_count: usize,
    pub final_loss: f64,
    pub bundle_path: PathBuf,
}

/// Risk levels above 1 saturate; negative levels count as 0.
pub fn label_for(risk_level: i32) -> f64 {
    f64::from(risk_level).clamp(0.0, 1.0)
}

pub fn build_training_set<S>(store: &S) -> Result<TrainingSet, StoreError>
where
    S: ZoneStore + WeatherStore,
{
    let mut set = TrainingSet::default();
    for zone in store.find_all()? {
        let readings = store.find_all_for_zone(zone.id)?;
        if readings.is_empty() {
            continue;
        }
        set.zone_count += 1;
        let label = label_for(zone.risk_level);
        for reading in &readings {
            set.rows.push(FeatureVector::from_reading(reading).0);
            set.labels.push(label);
        }
    }
    Ok(set)
}

fn column_stats(rows: &[[f64; FEATURE_COUNT]]) -> ([f64; FEATURE_COUNT], [f64; FEATURE_COUNT]) {
    let n = rows.len() as f64;
    let mut means = [0.0; FEATURE_COUNT];
    for row in rows {
        for (mean, value) in means.iter_mut().zip(row) {
            *mean += value / n;
        }
    }

    let mut scales = [0.0; FEATURE_COUNT];
    for row in rows {
        for i in 0..FEATURE_COUNT {
            scales[i] += (row[i] - means[i]).powi(2) / n;
        }
    }
    for scale in scales.iter_mut() {
        let std_dev = scale.sqrt();
        *scale = if std_dev > MIN_SCALE { std_dev } else { 1.0 };
    }
    (means, scales)
}

fn mean_log_loss(model: &ScoringModel, set: &TrainingSet) -> f64 {
    let total: f64 = set
        .rows
        .iter()
        .zip(&set.labels)
        .map(|(row, &y)| {
            let p = model
                .predict(&FeatureVector(*row))
                .clamp(LOSS_EPSILON, 1.0 - LOSS_EPSILON);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / set.len() as f64
}

/// Fits a model to `set`. Returns the model and its final mean log-loss.
pub fn fit(set: &TrainingSet, config: &TrainingConfig) -> Result<(ScoringModel, f64), TrainError> {
    if set.is_empty() {
        return Err(TrainError::NoTrainingData);
    }

    let (means, scales) = column_stats(&set.rows);
    let standardized: Vec<[f64; FEATURE_COUNT]> = set
        .rows
        .iter()
        .map(|row| {
            let mut z = [0.0; FEATURE_COUNT];
            for i in 0..FEATURE_COUNT {
                z[i] = (row[i] - means[i]) / scales[i];
            }
            z
        })
        .collect();

    let n = set.len() as f64;
    let mut weights = [0.0; FEATURE_COUNT];
    let mut bias = 0.0;

    for _ in 0..config.epochs {
        let mut grad_w = [0.0; FEATURE_COUNT];
        let mut grad_b = 0.0;
        for (x, &y) in standardized.iter().zip(&set.labels) {
            let z = bias + weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>();
            let error = sigmoid(z) - y;
            for i in 0..FEATURE_COUNT {
                grad_w[i] += error * x[i];
            }
            grad_b += error;
        }
        for i in 0..FEATURE_COUNT {
            weights[i] -= config.learning_rate * grad_w[i] / n;
        }
        bias -= config.learning_rate * grad_b / n;
    }

    let model = ScoringModel::new(means, scales, weights, bias, Utc::now(), set.len());
    if !model.is_well_formed() {
        return Err(TrainError::Diverged(
            "non-finite parameter or zero feature scale".to_string(),
        ));
    }
    let loss = mean_log_loss(&model, set);
    Ok((model, loss))
}

/// Builds the training set from the store, fits, and persists the model.
pub fn train_model<S>(
    store: &S,
    model_store: &ModelStore,
    config: &TrainingConfig,
) -> Result<TrainingReport, TrainError>
where
    S: ZoneStore + WeatherStore,
{
    let set = build_training_set(store)?;
    if set.is_empty() {
        logging::warn(Component::Trainer, None, "no weather readings to train on; model left unchanged");
        return Err(TrainError::NoTrainingData);
    }

    let (model, final_loss) = fit(&set, config)?;
    let bundle_path = model_store.save(&model).map_err(|source| TrainError::Save {
        path: model_store.dir().to_path_buf(),
        source,
    })?;

    logging::info(
        Component::Trainer,
        None,
        &format!(
            "trained on {} readings from {} zone(s), loss {:.4}, saved to {}",
            set.len(),
            set.zone_count,
            final_loss,
            bundle_path.display()
        ),
    );

    Ok(TrainingReport {
        sample_count: set.len(),
        zone_count: set.zone_count,
        final_loss,
        bundle_path,
    })
}
