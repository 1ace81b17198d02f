/// Structured logging for the zone risk service
///
/// Every message carries the component that produced it and, where there
/// is one, the zone it concerns. Failures are classified before logging so
/// that expected states (no model trained yet) stay quiet while service
/// degradation (corrupt bundle, API errors) is raised to warn/error.
///
/// Output goes through `tracing`; `init_logging` installs the subscriber
/// for console (stderr) and optional append-only file output.

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

use crate::error::{DeliveryError, IngestError, ModelError};
use crate::model::ZoneId;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Predictor,
    ModelStore,
    Trainer,
    Notifier,
    Ingest,
    Database,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Predictor => write!(f, "PREDICT"),
            Component::ModelStore => write!(f, "MODEL"),
            Component::Trainer => write!(f, "TRAIN"),
            Component::Notifier => write!(f, "NOTIFY"),
            Component::Ingest => write!(f, "INGEST"),
            Component::Database => write!(f, "DB"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - a normal state of the system (e.g. not trained yet)
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A missing model is the steady state before the first training run.
pub fn classify_model_failure(err: &ModelError) -> FailureType {
    match err {
        ModelError::NotFound(_) => FailureType::Expected,
        ModelError::Corrupt { .. } => FailureType::Unexpected,
    }
}

/// Timeouts and connection resets are often transient; anything the API
/// actually answered with is not.
pub fn classify_ingest_failure(err: &IngestError) -> FailureType {
    match err {
        IngestError::Transport(e) if e.is_timeout() || e.is_connect() => FailureType::Unknown,
        IngestError::Transport(_) => FailureType::Unexpected,
        IngestError::Http(429) => FailureType::Unknown,
        IngestError::Http(_) | IngestError::Parse(_) | IngestError::Store(_) => {
            FailureType::Unexpected
        }
    }
}

// ---------------------------------------------------------------------------
// Initialisation
// ---------------------------------------------------------------------------

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set. An unparseable level
/// falls back to `info`. Calling this twice is harmless; the second call
/// keeps the first subscriber.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    Ok(())
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

pub fn info(component: Component, zone: Option<ZoneId>, message: &str) {
    tracing::info!(component = %component, zone = zone.map(|z| z.0), "{}", message);
}

pub fn warn(component: Component, zone: Option<ZoneId>, message: &str) {
    tracing::warn!(component = %component, zone = zone.map(|z| z.0), "{}", message);
}

pub fn error(component: Component, zone: Option<ZoneId>, message: &str) {
    tracing::error!(component = %component, zone = zone.map(|z| z.0), "{}", message);
}

pub fn debug(component: Component, zone: Option<ZoneId>, message: &str) {
    tracing::debug!(component = %component, zone = zone.map(|z| z.0), "{}", message);
}

fn log_classified(component: Component, zone: Option<ZoneId>, failure_type: &FailureType, message: &str) {
    match failure_type {
        FailureType::Expected => info(component, zone, message),
        FailureType::Unexpected => error(component, zone, message),
        FailureType::Unknown => warn(component, zone, message),
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Records why the predictor is running on the heuristic.
///
/// A corrupt bundle is logged at warn rather than error: it degrades
/// scoring but the service keeps producing valid predictions.
pub fn log_model_load_failure(err: &ModelError) {
    let failure_type = classify_model_failure(err);
    let message = format!("model load failed [{}], using heuristic: {}", failure_type, err);
    match failure_type {
        FailureType::Expected => info(Component::ModelStore, None, &message),
        _ => warn(Component::ModelStore, None, &message),
    }
}

pub fn log_ingest_failure(zone: ZoneId, operation: &str, err: &IngestError) {
    let failure_type = classify_ingest_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);
    log_classified(Component::Ingest, Some(zone), &failure_type, &message);
}

pub fn log_delivery_failure(zone: ZoneId, err: &DeliveryError) {
    let message = format!("delivery failed [{}]: {}", FailureType::Unknown, err);
    log_classified(Component::Notifier, Some(zone), &FailureType::Unknown, &message);
}

// ---------------------------------------------------------------------------
// Batch Summary Logging
// ---------------------------------------------------------------------------

/// Log the outcome of a batch over many zones or recipients.
pub fn log_batch_summary(component: Component, operation: &str, total: usize, successful: usize, failed: usize) {
    let message = format!(
        "{} complete: {}/{} successful, {} failed",
        operation, successful, total, failed
    );

    if failed == 0 {
        info(component, None, &message);
    } else if successful == 0 {
        error(component, None, &message);
    } else {
        warn(component, None, &message);
    }
}
