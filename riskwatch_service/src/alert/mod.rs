/// Alerting for zones whose predicted risk crosses the threshold.
///
/// Submodules:
/// - `thresholds` — validated threshold and breach filtering.
/// - `notify`     — message formatting and subscriber fan-out.

pub mod notify;
pub mod thresholds;

pub use self::notify::{notify_subscribers, Channel, Dispatch, LogDispatch, Message, NotificationReport};
pub use self::thresholds::{breaches, RiskThreshold};
