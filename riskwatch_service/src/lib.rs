//! Zone risk monitoring service.
//!
//! Scores each monitored zone's disaster risk from its latest weather
//! reading, using a trained model when one is available and a fixed
//! heuristic otherwise, and alerts subscribers when a zone's risk reaches
//! the configured threshold.

pub mod alert;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod model_store;
pub mod predictor;
pub mod scoring;
pub mod store;
pub mod train;

pub use crate::model_store::ModelStore;
pub use crate::predictor::{ModelState, RiskPredictor};
