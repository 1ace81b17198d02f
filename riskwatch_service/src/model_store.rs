/// On-disk persistence of the trained scoring model.
///
/// The model lives as a bundle directory holding a single `model.json`.
/// A missing directory is the normal "not trained yet" state and loads as
/// `ModelError::NotFound`; anything wrong inside an existing directory is
/// `ModelError::Corrupt`. Neither is ever raised to the prediction caller.
///
/// Saving writes `model.json.tmp` and renames it over `model.json`, so a
/// concurrent reader sees either the old bundle or the new one. Two
/// training runs racing on save resolve to whichever renames last.

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::FEATURE_COUNT;
use crate::scoring::ScoringModel;

pub const BUNDLE_FILE: &str = "model.json";
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

/// What `model.json` contains. Vectors rather than arrays so that a bundle
/// with the wrong number of features fails validation with a clear reason
/// instead of a generic parse error.
#[derive(Debug, Serialize, Deserialize)]
struct ModelBundle {
    format_version: u32,
    feature_means: Vec<f64>,
    feature_scales: Vec<f64>,
    weights: Vec<f64>,
    bias: f64,
    trained_at: DateTime<Utc>,
    sample_count: usize,
}

impl From<&ScoringModel> for ModelBundle {
    fn from(model: &ScoringModel) -> Self {
        ModelBundle {
            format_version: FORMAT_VERSION,
            feature_means: model.feature_means.to_vec(),
            feature_scales: model.feature_scales.to_vec(),
            weights: model.weights.to_vec(),
            bias: model.bias,
            trained_at: model.trained_at,
            sample_count: model.sample_count,
        }
    }
}

fn to_feature_array(name: &str, values: &[f64]) -> Result<[f64; FEATURE_COUNT], String> {
    values.try_into().map_err(|_| {
        format!(
            "{} has {} values, expected {}",
            name,
            values.len(),
            FEATURE_COUNT
        )
    })
}

impl TryFrom<ModelBundle> for ScoringModel {
    type Error = String;

    fn try_from(bundle: ModelBundle) -> Result<Self, Self::Error> {
        if bundle.format_version != FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                bundle.format_version, FORMAT_VERSION
            ));
        }
        let model = ScoringModel::new(
            to_feature_array("feature_means", &bundle.feature_means)?,
            to_feature_array("feature_scales", &bundle.feature_scales)?,
            to_feature_array("weights", &bundle.weights)?,
            bundle.bias,
            bundle.trained_at,
            bundle.sample_count,
        );
        if !model.is_well_formed() {
            return Err("non-finite parameter or zero feature scale".to_string());
        }
        Ok(model)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn bundle_path(&self) -> PathBuf {
        self.dir.join(BUNDLE_FILE)
    }

    pub fn exists(&self) -> bool {
        self.dir.exists()
    }

    /// Writes the bundle, creating the directory if needed. Returns the
    /// path of the written `model.json`.
    ///
    /// A model that `load` would reject is refused before anything on disk
    /// changes. On a failed write the temporary file is removed and the
    /// previous bundle stays in place.
    pub fn save(&self, model: &ScoringModel) -> io::Result<PathBuf> {
        if !model.is_well_formed() {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "refusing to save model with non-finite parameters or zero feature scale",
            ));
        }
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_vec_pretty(&ModelBundle::from(model))
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;

        let final_path = self.bundle_path();
        let tmp_path = self.dir.join(format!("{}.tmp", BUNDLE_FILE));
        let written = fs::File::create(&tmp_path).and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp_path, &final_path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        Ok(final_path)
    }

    pub fn load(&self) -> Result<ScoringModel, ModelError> {
        let corrupt = |reason: String| ModelError::Corrupt {
            path: self.dir.clone(),
            reason,
        };

        match fs::metadata(&self.dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(corrupt("model path is not a directory".to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ModelError::NotFound(self.dir.clone()));
            }
            Err(e) => return Err(corrupt(format!("cannot stat model directory: {}", e))),
        }

        let bytes = fs::read(self.bundle_path()).map_err(|e| match e.kind() {
            ErrorKind::NotFound => corrupt(format!("{} is missing", BUNDLE_FILE)),
            _ => corrupt(format!("cannot read {}: {}", BUNDLE_FILE, e)),
        })?;

        let bundle: ModelBundle = serde_json::from_slice(&bytes)
            .map_err(|e| corrupt(format!("invalid {}: {}", BUNDLE_FILE, e)))?;

        ScoringModel::try_from(bundle).map_err(corrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FeatureVector;
    use chrono::TimeZone;

    fn sample_model() -> ScoringModel {
        ScoringModel::new(
            [18.0, 55.0, 9.0],
            [6.0, 21.0, 7.5],
            [0.1, -1.2, 2.3],
            -0.4,
            Utc.with_ymd_and_hms(2025, 6, 12, 8, 30, 0).unwrap(),
            42,
        )
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path().join("model"));
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(ModelError::NotFound(_))));
    }

    #[test]
    fn test_save_creates_directory_and_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path().join("nested").join("model"));
        let model = sample_model();

        let written = store.save(&model).unwrap();
        assert_eq!(written, store.bundle_path());
        assert!(!store.dir().join("model.json.tmp").exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, model);
        let features = FeatureVector::new(25.0, 20.0, 30.0);
        assert_eq!(loaded.predict(&features).to_bits(), model.predict(&features).to_bits());
    }

    #[test]
    fn test_empty_directory_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path());
        match store.load() {
            Err(ModelError::Corrupt { reason, .. }) => assert!(reason.contains("missing")),
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_bundle_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(BUNDLE_FILE), b"{ not json").unwrap();
        let store = ModelStore::new(tmp.path());
        assert!(matches!(store.load(), Err(ModelError::Corrupt { .. })));
    }

    #[test]
    fn test_wrong_feature_count_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let body = r#"{
            "format_version": 1,
            "feature_means": [0.0, 0.0],
            "feature_scales": [1.0, 1.0],
            "weights": [0.5, 0.5],
            "bias": 0.0,
            "trained_at": "2025-06-12T08:30:00Z",
            "sample_count": 3
        }"#;
        fs::write(tmp.path().join(BUNDLE_FILE), body).unwrap();
        match ModelStore::new(tmp.path()).load() {
            Err(ModelError::Corrupt { reason, .. }) => {
                assert!(reason.contains("feature_means has 2 values"), "reason was {}", reason)
            }
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_future_format_version_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path());
        store.save(&sample_model()).unwrap();
        let text = fs::read_to_string(store.bundle_path()).unwrap();
        fs::write(
            store.bundle_path(),
            text.replace("\"format_version\": 1", "\"format_version\": 2"),
        )
        .unwrap();
        assert!(matches!(store.load(), Err(ModelError::Corrupt { .. })));
    }

    #[test]
    fn test_file_in_place_of_directory_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("model");
        fs::write(&path, b"").unwrap();
        assert!(matches!(ModelStore::new(&path).load(), Err(ModelError::Corrupt { .. })));
    }

    #[test]
    fn test_failed_save_removes_temporary_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path());
        // A non-empty directory where model.json belongs makes the rename fail.
        fs::create_dir_all(store.bundle_path().join("blocker")).unwrap();

        assert!(store.save(&sample_model()).is_err());
        assert!(!tmp.path().join("model.json.tmp").exists());
    }

    #[test]
    fn test_unloadable_model_is_not_saved() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path().join("model"));
        store.save(&sample_model()).unwrap();

        let mut broken = sample_model();
        broken.feature_means[0] = f64::NAN;
        let err = store.save(&broken).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(store.load().unwrap(), sample_model());
    }

    #[test]
    fn test_save_overwrites_previous_bundle() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path());
        store.save(&sample_model()).unwrap();

        let mut newer = sample_model();
        newer.bias = 1.25;
        store.save(&newer).unwrap();
        assert_eq!(store.load().unwrap().bias(), 1.25);
    }
}
