use async_trait::async_trait;
use openpenpal_models::security::AuditEvent;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::{error, warn};

const AUDIT_CHANNEL_CAPACITY: usize = 1000;

/// Persistence target for drained audit events. Implemented by
/// `openpenpal-store`'s `AuditRepository` at the composition root; kept as a
/// narrow trait here so this crate never depends on the persistence stack.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, event: AuditEvent);
}

/// Bounded, non-blocking audit pipeline (spec §4.1). `enqueue` never
/// suspends and never fails the calling request: once the queue is at
/// capacity, the oldest queued event is dropped to make room for the
/// incoming one, and `dropped_count` is incremented (spec §4.1/§5 "drop
/// oldest" backpressure policy). A plain `VecDeque` behind a `Mutex`
/// rather than an `mpsc` channel, since draining needs to pop from the
/// front on overflow, not just on drain.
#[derive(Clone)]
pub struct AuditWriter {
    queue: Arc<Mutex<VecDeque<AuditEvent>>>,
    notify: Arc<Notify>,
    dropped_count: Arc<AtomicU64>,
}

impl AuditWriter {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        let queue = Arc::new(Mutex::new(VecDeque::with_capacity(AUDIT_CHANNEL_CAPACITY)));
        let notify = Arc::new(Notify::new());
        let dropped_count = Arc::new(AtomicU64::new(0));

        let drain_queue = queue.clone();
        let drain_notify = notify.clone();
        tokio::spawn(async move {
            loop {
                let next = drain_queue.lock().expect("audit queue lock poisoned").pop_front();
                match next {
                    Some(event) => sink.write(event).await,
                    None => drain_notify.notified().await,
                }
            }
        });

        Self { queue, notify, dropped_count }
    }

    /// Enqueues an event, dropping the oldest queued event (not the
    /// incoming one) if the queue is already at capacity.
    pub fn enqueue(&self, event: AuditEvent) {
        let mut queue = self.queue.lock().expect("audit queue lock poisoned");
        if queue.len() >= AUDIT_CHANNEL_CAPACITY {
            queue.pop_front();
            let total = self.dropped_count.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(total_dropped = total, "audit queue full, dropping oldest event");
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_one();
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }
}

/// Fallback sink used when no persistence backend is wired up (tests, or a
/// component running before the store is ready). Never the production sink.
pub struct LoggingAuditSink;

#[async_trait]
impl AuditSink for LoggingAuditSink {
    async fn write(&self, event: AuditEvent) {
        match event.severity {
            openpenpal_models::security::AuditSeverity::Critical => {
                error!(request_id = %event.request_id, category = %event.category, "audit: {}", event.reason);
            }
            _ => {
                tracing::info!(request_id = %event.request_id, category = %event.category, "audit: {}", event.reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpenpal_models::security::{AuditResult, AuditSeverity};
    use uuid::Uuid;

    fn sample_event() -> AuditEvent {
        AuditEvent {
            request_id: Uuid::new_v4(),
            user_id: Some("u1".into()),
            category: "security".into(),
            severity: AuditSeverity::Info,
            result: AuditResult::Allowed,
            resource: "letters".into(),
            action: "read".into(),
            reason: "ok".into(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn enqueue_delivers_to_sink() {
        struct CountingSink(Arc<AtomicU64>);
        #[async_trait]
        impl AuditSink for CountingSink {
            async fn write(&self, _event: AuditEvent) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counter = Arc::new(AtomicU64::new(0));
        let writer = AuditWriter::new(Arc::new(CountingSink(counter.clone())));
        writer.enqueue(sample_event());

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
