use async_trait::async_trait;
use openpenpal_letters::NotificationSink;
use openpenpal_models::credit::OutboundNotification;
use tracing::info;

/// Default `NotificationSink`: email/push transport is an external
/// collaborator this system only consumes through an interface (spec §1
/// Non-goals), so this just logs the dispatch. A real transport can
/// implement the same trait and be swapped in at the composition root
/// without touching `openpenpal-letters`.
pub struct LoggingNotificationSink;

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn notify(&self, notification: OutboundNotification) {
        info!(
            user_id = %notification.user_id,
            reference_id = %notification.reference_id,
            title = %notification.title,
            "dispatching notification"
        );
    }
}
