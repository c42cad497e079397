//! Transport seam: the async call that actually delivers a notification.

use std::sync::Arc;

use vigil_model::{Notification, NotificationKind};

/// Errors surfaced by a notification transport.
///
/// Opaque to the scheduler: a failed send is logged, never retried here.
/// Retry is expressed through the renotification schedule, not the
/// transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Trait for the external delivery layer.
///
/// Implementations perform the actual send (subprocess, HTTP, SMTP, ...)
/// and may block on I/O; the scheduler never calls this while holding its
/// lock. Implementations that compute reminder intervals should advance
/// the notification's next-fire time before returning.
#[async_trait::async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Deliver one notification. `renotification` is true for reminder
    /// sends initiated by the dispatch loop.
    async fn send(
        &self,
        notification: &Arc<Notification>,
        kind: NotificationKind,
        renotification: bool,
    ) -> Result<(), TransportError>;

    /// Human-readable name for this transport (e.g., "command", "log").
    fn transport_name(&self) -> &str;
}
