use crate::repositories::AuditRepository;
use async_trait::async_trait;
use openpenpal_security::AuditSink;
use openpenpal_models::security::AuditEvent;
use tracing::warn;

/// Adapts [`AuditRepository`] to the narrow [`AuditSink`] interface the
/// control plane's background writer drains into (spec §4.1/§9), the same
/// shape as `openpenpal-credit`'s `StoreCreditLedger`.
pub struct StoreAuditSink {
    repository: AuditRepository,
}

impl StoreAuditSink {
    pub fn new(repository: AuditRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl AuditSink for StoreAuditSink {
    async fn write(&self, event: AuditEvent) {
        if let Err(err) = self.repository.insert(&event).await {
            warn!(error = %err, request_id = %event.request_id, "failed to persist audit event");
        }
    }
}
