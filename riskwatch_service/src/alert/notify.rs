//! Subscriber notification fan-out.
//!
//! Runs a prediction over every zone, keeps the breaching ones, and sends
//! one message per contact on each matching subscription: an email when
//! the subscription has an address, an SMS when it has a phone number.
//!
//! A failed delivery is logged and counted but does not stop the run. A
//! failed query does.

use std::fmt;

use chrono::{DateTime, Utc};

use super::thresholds::{breaches, RiskThreshold};
use crate::error::{DeliveryError, NotifyError};
use crate::logging::{self, Component};
use crate::model::{Prediction, Subscription, ZoneId};
use crate::predictor::RiskPredictor;
use crate::store::{SubscriptionStore, WeatherStore, ZoneStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
}

impl Channel {
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub channel: Channel,
    pub zone_id: ZoneId,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Delivery channel. Real email/SMS providers plug in here.
pub trait Dispatch {
    fn send(&self, message: &Message) -> Result<(), DeliveryError>;
}

/// Writes each message to the log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatch;

impl Dispatch for LogDispatch {
    fn send(&self, message: &Message) -> Result<(), DeliveryError> {
        logging::info(
            Component::Notifier,
            Some(message.zone_id),
            &format!(
                "[{}] to {}: {} | {}",
                message.channel, message.recipient, message.subject, message.body
            ),
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationReport {
    pub zones_breached: usize,
    pub messages_sent: usize,
    pub deliveries_failed: usize,
    /// Subscriptions with neither an email nor a phone number.
    pub subscriptions_skipped: usize,
}

// ---------------------------------------------------------------------------
// Message formatting
// ---------------------------------------------------------------------------

/// `Alert: zone <name> at risk <pct>%`, percentage with one decimal.
pub fn alert_text(prediction: &Prediction) -> String {
    format!(
        "Alert: zone {} at risk {:.1}%",
        prediction.zone_name,
        prediction.score * 100.0
    )
}

fn observed_at(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts.to_rfc3339(),
        None => "unknown time".to_string(),
    }
}

/// The messages one subscription should receive for one breaching zone.
pub fn build_messages(prediction: &Prediction, subscription: &Subscription) -> Vec<Message> {
    let text = alert_text(prediction);
    let body = format!("{} at {}", text, observed_at(prediction.timestamp));
    let subject = format!("Disaster alert - {}", prediction.zone_name);

    let mut messages = Vec::with_capacity(2);
    if let Some(email) = subscription.email.as_deref().filter(|e| !e.is_empty()) {
        messages.push(Message {
            channel: Channel::Email,
            zone_id: prediction.zone_id,
            recipient: email.to_string(),
            subject: subject.clone(),
            body: body.clone(),
        });
    }
    if let Some(phone) = subscription.phone_number.as_deref().filter(|p| !p.is_empty()) {
        messages.push(Message {
            channel: Channel::Sms,
            zone_id: prediction.zone_id,
            recipient: phone.to_string(),
            subject,
            body,
        });
    }
    messages
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

pub fn notify_subscribers<S, U, D>(
    predictor: &RiskPredictor<S>,
    subscriptions: &U,
    threshold: RiskThreshold,
    dispatch: &D,
) -> Result<NotificationReport, NotifyError>
where
    S: ZoneStore + WeatherStore,
    U: SubscriptionStore + ?Sized,
    D: Dispatch + ?Sized,
{
    let predictions = predictor.predict(None).map_err(NotifyError::Prediction)?;
    let mut report = NotificationReport::default();

    for prediction in breaches(&predictions, threshold) {
        report.zones_breached += 1;
        let subs = subscriptions
            .find_by_zone(prediction.zone_id)
            .map_err(NotifyError::Subscriptions)?;

        for subscription in &subs {
            let messages = build_messages(prediction, subscription);
            if messages.is_empty() {
                report.subscriptions_skipped += 1;
                logging::warn(
                    Component::Notifier,
                    Some(prediction.zone_id),
                    &format!("subscription {} has no contact details", subscription.id),
                );
                continue;
            }
            for message in &messages {
                match dispatch.send(message) {
                    Ok(()) => report.messages_sent += 1,
                    Err(err) => {
                        report.deliveries_failed += 1;
                        logging::log_delivery_failure(prediction.zone_id, &err);
                    }
                }
            }
        }
    }

    logging::log_batch_summary(
        Component::Notifier,
        "notification",
        report.messages_sent + report.deliveries_failed,
        report.messages_sent,
        report.deliveries_failed,
    );
    Ok(report)
}
