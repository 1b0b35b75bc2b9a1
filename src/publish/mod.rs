//! Publishing pipeline.
//!
//! Orchestrates topic naming, the broker send primitive, and audit
//! recording. Broker I/O runs on spawned tasks admitted through a
//! bounded worker pool, so a slow broker never occupies the caller's
//! processing task. Every attempt ends in exactly one audit record and a
//! resolved result - including faults raised before the send itself.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::audit::{AuditRecorder, AuditSink, AuditState};
use crate::broker::{BrokerError, BrokerSend};
use crate::config::PublishingConfig;
use crate::event::Event;
use crate::topic;

/// Audit reason for a broker negative ack.
pub const REASON_NOT_SENT: &str = "Event was not sent";
/// Audit reason for a fault before the broker could ack.
pub const REASON_PUBLISH_ERROR: &str = "Error publishing event";

/// Result type for publish operations.
pub type Result<T> = std::result::Result<T, PublishError>;

/// Errors that can terminate a publish attempt.
///
/// Every variant is paired with a REJECTED audit record; none leaves the
/// attempt unresolved.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The broker reported a negative acknowledgment.
    #[error("Event was not sent")]
    Rejected {
        #[source]
        source: BrokerError,
    },

    /// Building the topic name or serializing the event failed before a
    /// send was possible.
    #[error("Error publishing event: {0}")]
    Preparation(String),

    /// The send task died before reporting an acknowledgment.
    #[error("Publish worker failed: {0}")]
    Worker(String),
}

/// Tenant-aware event publisher.
///
/// One instance per process: the broker handle and the worker pool are
/// shared across all tenants and event types. A single tenant under load
/// can exhaust shared publish capacity for all tenants; partitioning the
/// pool per tenant is out of scope.
pub struct Publisher {
    env_id: String,
    broker: Arc<dyn BrokerSend>,
    audit: AuditRecorder,
    workers: Arc<Semaphore>,
}

impl Publisher {
    /// Create a publisher for the configured deployment environment.
    ///
    /// The worker pool size is fixed at startup.
    pub fn new(
        env_id: impl Into<String>,
        broker: Arc<dyn BrokerSend>,
        audit_sink: Arc<dyn AuditSink>,
        config: &PublishingConfig,
    ) -> Self {
        Self {
            env_id: env_id.into(),
            broker,
            audit: AuditRecorder::new(audit_sink),
            workers: Arc::new(Semaphore::new(config.worker_pool_size)),
        }
    }

    /// Publish one event for one tenant.
    ///
    /// Resolves `Ok` on broker acknowledgment and `Err` on any failure;
    /// the attempt is audited exactly once either way. No retries - retry
    /// policy, if any, belongs to the caller.
    pub async fn publish(&self, event: Event, tenant_id: &str) -> Result<()> {
        let tenant = tenant_id.to_string();

        let topic = match topic::name_for(&self.env_id, &tenant, &event.event_type) {
            Ok(topic) => topic,
            Err(e) => return Err(self.reject_before_send(&event, &tenant, e.to_string())),
        };

        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => return Err(self.reject_before_send(&event, &tenant, e.to_string())),
        };

        // Admission into the shared worker pool bounds concurrent sends.
        let permit = match Arc::clone(&self.workers).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => return Err(self.reject_before_send(&event, &tenant, e.to_string())),
        };

        let broker = Arc::clone(&self.broker);
        let audit = self.audit.clone();
        let audit_event = event.clone();
        let task_tenant = tenant.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;

            match broker.send(&topic, &payload).await {
                Ok(()) => {
                    info!(
                        event_type = %event.event_type,
                        event_id = %event.id,
                        topic = %topic,
                        "Sent event"
                    );
                    audit.record(&event, &task_tenant, AuditState::Published, None);
                    Ok(())
                }
                Err(cause) => {
                    error!(
                        event_id = %event.id,
                        topic = %topic,
                        error = %cause,
                        "{}", REASON_NOT_SENT
                    );
                    audit.record(&event, &task_tenant, AuditState::Rejected, Some(REASON_NOT_SENT));
                    Err(PublishError::Rejected { source: cause })
                }
            }
        });

        match handle.await {
            Ok(outcome) => outcome,
            // The task audits on both of its branches; reaching here means
            // it died before either one.
            Err(join_error) => {
                error!(event_id = %audit_event.id, error = %join_error, "{}", REASON_PUBLISH_ERROR);
                self.audit.record(
                    &audit_event,
                    &tenant,
                    AuditState::Rejected,
                    Some(REASON_PUBLISH_ERROR),
                );
                Err(PublishError::Worker(join_error.to_string()))
            }
        }
    }

    fn reject_before_send(&self, event: &Event, tenant: &str, cause: String) -> PublishError {
        error!(event_id = %event.id, error = %cause, "{}", REASON_PUBLISH_ERROR);
        self.audit
            .record(event, tenant, AuditState::Rejected, Some(REASON_PUBLISH_ERROR));
        PublishError::Preparation(cause)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::audit::MockAuditSink;
    use crate::broker::MockBroker;

    fn publisher(
        broker: Arc<dyn BrokerSend>,
        sink: Arc<MockAuditSink>,
        pool_size: usize,
    ) -> Publisher {
        Publisher::new(
            "dev",
            broker,
            sink,
            &PublishingConfig {
                worker_pool_size: pool_size,
            },
        )
    }

    fn event(id: &str) -> Event {
        Event {
            id: id.to_string(),
            event_type: "RECORD_CREATED".to_string(),
            event_payload: serde_json::json!({"recordId": 1}),
        }
    }

    #[tokio::test]
    async fn test_publish_success_audits_published() {
        let broker = Arc::new(MockBroker::new());
        let sink = Arc::new(MockAuditSink::new());
        let publisher = publisher(broker.clone(), sink.clone(), 20);

        publisher.publish(event("e1"), "t1").await.unwrap();

        sink.wait_for_records(1).await;
        let saved = sink.take_saved().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].state, AuditState::Published);
        assert_eq!(saved[0].event_id, "e1");
        assert!(saved[0].error_message.is_none());

        let sent = broker.take_sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "dev.t1.RECORD_CREATED");
        let on_wire: Event = serde_json::from_str(&sent[0].1).unwrap();
        assert_eq!(on_wire, event("e1"));
    }

    #[tokio::test]
    async fn test_publish_broker_failure_audits_rejected() {
        let broker = Arc::new(MockBroker::new());
        broker.set_fail_on_send(true).await;
        let sink = Arc::new(MockAuditSink::new());
        let publisher = publisher(broker.clone(), sink.clone(), 20);

        let result = publisher.publish(event("e1"), "t1").await;

        assert!(matches!(result, Err(PublishError::Rejected { .. })));
        sink.wait_for_records(1).await;
        let saved = sink.take_saved().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].state, AuditState::Rejected);
        assert_eq!(saved[0].error_message.as_deref(), Some(REASON_NOT_SENT));
    }

    #[tokio::test]
    async fn test_publish_bad_tenant_audits_rejected_without_send() {
        let broker = Arc::new(MockBroker::new());
        let sink = Arc::new(MockAuditSink::new());
        let publisher = publisher(broker.clone(), sink.clone(), 20);

        let result = publisher.publish(event("e1"), "bad.tenant").await;

        assert!(matches!(result, Err(PublishError::Preparation(_))));
        sink.wait_for_records(1).await;
        let saved = sink.take_saved().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].state, AuditState::Rejected);
        assert_eq!(
            saved[0].error_message.as_deref(),
            Some(REASON_PUBLISH_ERROR)
        );
        assert_eq!(broker.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_audit_sink_failure_does_not_fail_publish() {
        let broker = Arc::new(MockBroker::new());
        let sink = Arc::new(MockAuditSink::new());
        sink.set_fail_on_save(true).await;
        let publisher = publisher(broker.clone(), sink.clone(), 20);

        publisher.publish(event("e1"), "t1").await.unwrap();

        assert_eq!(broker.sent_count().await, 1);
    }

    /// Broker that tracks how many sends are in flight at once.
    struct GaugedBroker {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl GaugedBroker {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BrokerSend for GaugedBroker {
        async fn send(&self, _topic: &str, _payload: &str) -> crate::broker::Result<()> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_worker_pool_bounds_concurrent_sends() {
        let broker = Arc::new(GaugedBroker::new());
        let sink = Arc::new(MockAuditSink::new());
        let publisher = Arc::new(publisher(broker.clone(), sink.clone(), 2));

        let attempts: Vec<_> = (0..6)
            .map(|i| {
                let publisher = Arc::clone(&publisher);
                tokio::spawn(async move {
                    publisher.publish(event(&format!("e{}", i)), "t1").await
                })
            })
            .collect();

        for attempt in attempts {
            attempt.await.unwrap().unwrap();
        }

        assert!(broker.max_in_flight.load(Ordering::SeqCst) <= 2);
        sink.wait_for_records(6).await;
        assert_eq!(sink.saved_count().await, 6);
    }
}
