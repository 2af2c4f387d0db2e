//! Tracing-only transport for local development and demos.

use vigil_core::alert::AlertPayload;
use vigil_core::types::SubscriberId;

use crate::router::{DeliveryError, NotificationTransport};

/// Writes every alert to the log instead of pushing it anywhere.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait::async_trait]
impl NotificationTransport for LogTransport {
    async fn deliver(
        &self,
        subscriber: SubscriberId,
        alert: &AlertPayload,
    ) -> Result<(), DeliveryError> {
        tracing::info!(
            subscriber = %subscriber,
            patient_id = %alert.patient_id,
            level = alert.level.as_str(),
            message = %alert.message,
            "ALERT"
        );
        Ok(())
    }
}
