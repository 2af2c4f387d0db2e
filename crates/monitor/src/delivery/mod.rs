//! Concrete notification transports.
//!
//! The router only knows the [`NotificationTransport`](crate::router::NotificationTransport)
//! capability; these are the transports a deployment can plug in.

pub mod log;
pub mod webhook;

pub use log::LogTransport;
pub use webhook::WebhookTransport;
