//! Webhook alert delivery with exponential-backoff retry.
//!
//! [`WebhookTransport`] POSTs a JSON-encoded alert to the endpoint
//! registered for each subscriber. Failed attempts are retried up to
//! three times with exponential backoff (1 s, 2 s, 4 s) before the
//! failure is reported back to the router.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use vigil_core::alert::AlertPayload;
use vigil_core::types::SubscriberId;

use crate::router::{DeliveryError, NotificationTransport};

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers alerts to per-subscriber webhook endpoints.
pub struct WebhookTransport {
    client: reqwest::Client,
    endpoints: RwLock<HashMap<SubscriberId, String>>,
}

impl WebhookTransport {
    /// Create a transport with a pre-configured HTTP client.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) a subscriber's webhook URL.
    pub fn register_endpoint(&self, subscriber: SubscriberId, url: impl Into<String>) {
        let mut map = self.endpoints.write().expect("endpoint map lock poisoned");
        map.insert(subscriber, url.into());
    }

    fn endpoint_for(&self, subscriber: &SubscriberId) -> Option<String> {
        let map = self.endpoints.read().expect("endpoint map lock poisoned");
        map.get(subscriber).cloned()
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, url: &str, alert: &AlertPayload) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(url)
            .json(alert)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DeliveryError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

impl Default for WebhookTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NotificationTransport for WebhookTransport {
    async fn deliver(
        &self,
        subscriber: SubscriberId,
        alert: &AlertPayload,
    ) -> Result<(), DeliveryError> {
        let url = self
            .endpoint_for(&subscriber)
            .ok_or(DeliveryError::NoEndpoint(subscriber))?;

        let mut last_err: Option<DeliveryError> = None;

        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.try_send(&url, alert).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        subscriber = %subscriber,
                        error = %e,
                        "Webhook alert delivery attempt failed, retrying"
                    );
                    last_err = Some(e);
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        // Final attempt after the last backoff.
        match self.try_send(&url, alert).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(
                    subscriber = %subscriber,
                    error = %e,
                    "Webhook alert delivery failed after all retries"
                );
                Err(last_err.unwrap_or(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn new_does_not_panic() {
        let _transport = WebhookTransport::new();
    }

    #[test]
    fn register_and_lookup_endpoint() {
        let transport = WebhookTransport::new();
        let subscriber = uuid::Uuid::new_v4();
        transport.register_endpoint(subscriber, "https://example.test/hook");
        assert_eq!(
            transport.endpoint_for(&subscriber).as_deref(),
            Some("https://example.test/hook")
        );
    }

    #[tokio::test]
    async fn unregistered_subscriber_fails_without_network() {
        let transport = WebhookTransport::new();
        let subscriber = uuid::Uuid::new_v4();
        let alert = AlertPayload::monitoring_lost(uuid::Uuid::new_v4(), 1);

        let err = transport.deliver(subscriber, &alert).await.unwrap_err();
        assert_matches!(err, DeliveryError::NoEndpoint(id) if id == subscriber);
    }
}
