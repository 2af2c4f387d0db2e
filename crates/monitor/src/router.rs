//! Per-patient alert fan-out.
//!
//! [`AlertRouter`] maps a patient to the set of subscribers who should
//! hear about their alerts and pushes every alert to every subscriber
//! through an injected [`NotificationTransport`]. One subscriber's
//! failure never suppresses delivery attempts to the others; the
//! outcomes are collected into a [`DispatchReport`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use futures::future::join_all;

use vigil_core::alert::AlertPayload;
use vigil_core::types::{PatientId, SubscriberId};

// ---------------------------------------------------------------------------
// DeliveryError
// ---------------------------------------------------------------------------

/// Per-subscriber delivery failure. Non-fatal: collected and reported,
/// never thrown as an aggregate that aborts the batch.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("no delivery endpoint registered for subscriber {0}")]
    NoEndpoint(SubscriberId),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("delivery rejected with status {0}")]
    Status(u16),
}

// ---------------------------------------------------------------------------
// NotificationTransport
// ---------------------------------------------------------------------------

/// External notification capability: push one alert to one subscriber.
#[async_trait::async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn deliver(
        &self,
        subscriber: SubscriberId,
        alert: &AlertPayload,
    ) -> Result<(), DeliveryError>;
}

// ---------------------------------------------------------------------------
// DispatchReport
// ---------------------------------------------------------------------------

/// Outcome of one delivery attempt.
#[derive(Debug)]
pub struct DeliveryAttempt {
    pub subscriber: SubscriberId,
    pub outcome: Result<(), DeliveryError>,
}

/// Every delivery attempt made for one dispatch call.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub attempts: Vec<DeliveryAttempt>,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.attempts.iter().filter(|a| a.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempts.len() - self.delivered()
    }

    pub fn is_fully_delivered(&self) -> bool {
        self.failed() == 0
    }
}

// ---------------------------------------------------------------------------
// AlertRouter
// ---------------------------------------------------------------------------

/// Maps patients to alert subscribers and fans alerts out to them.
///
/// The subscription map is read-mostly: cycles snapshot the subscriber
/// set under a short read lock and never hold it across a delivery.
pub struct AlertRouter {
    subscriptions: RwLock<HashMap<PatientId, HashSet<SubscriberId>>>,
    transport: Arc<dyn NotificationTransport>,
}

impl AlertRouter {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            transport,
        }
    }

    /// Subscribe an identity to a patient's alerts.
    ///
    /// Membership is caller-managed; nothing is subscribed implicitly.
    pub fn subscribe(&self, patient_id: PatientId, subscriber: SubscriberId) {
        let mut map = self
            .subscriptions
            .write()
            .expect("subscription map lock poisoned");
        map.entry(patient_id).or_default().insert(subscriber);
    }

    /// Remove a subscription; unknown pairs are a no-op.
    pub fn unsubscribe(&self, patient_id: &PatientId, subscriber: &SubscriberId) {
        let mut map = self
            .subscriptions
            .write()
            .expect("subscription map lock poisoned");
        if let Some(set) = map.get_mut(patient_id) {
            set.remove(subscriber);
            if set.is_empty() {
                map.remove(patient_id);
            }
        }
    }

    /// Current subscriber set for a patient (empty if none).
    pub fn subscribers(&self, patient_id: &PatientId) -> Vec<SubscriberId> {
        let map = self
            .subscriptions
            .read()
            .expect("subscription map lock poisoned");
        map.get(patient_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Deliver each alert to each of the patient's subscribers.
    ///
    /// An empty subscriber set is not an error — the report is simply
    /// empty. All (subscriber, alert) deliveries run concurrently and
    /// failures are collected per attempt.
    pub async fn dispatch(&self, patient_id: PatientId, alerts: &[AlertPayload]) -> DispatchReport {
        let subscribers = self.subscribers(&patient_id);
        if subscribers.is_empty() || alerts.is_empty() {
            return DispatchReport::default();
        }

        let deliveries = alerts.iter().flat_map(|alert| {
            subscribers.iter().map(move |subscriber| {
                let subscriber = *subscriber;
                async move {
                    let outcome = self.transport.deliver(subscriber, alert).await;
                    if let Err(ref e) = outcome {
                        tracing::warn!(
                            patient_id = %patient_id,
                            subscriber = %subscriber,
                            error = %e,
                            "Alert delivery failed"
                        );
                    }
                    DeliveryAttempt {
                        subscriber,
                        outcome,
                    }
                }
            })
        });

        let attempts = join_all(deliveries).await;
        DispatchReport { attempts }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
