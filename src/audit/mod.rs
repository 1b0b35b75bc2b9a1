//! Publish-attempt auditing.
//!
//! The audit trail is the source of truth for "was this event
//! published": every publish attempt produces exactly one record,
//! whichever way the attempt ends. Recording is fire-and-forget - a sink
//! failure is logged and swallowed, never surfaced to the publish
//! caller.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::event::Event;

pub mod mock;

pub use mock::MockAuditSink;

/// Result type for audit sink operations.
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors that can occur while writing an audit record.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Audit sink rejected record: {0}")]
    Sink(String),
}

/// Terminal state of one publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditState {
    Published,
    Rejected,
}

impl AuditState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditState::Published => "PUBLISHED",
            AuditState::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for AuditState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one publish attempt's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMessage {
    pub event_id: String,
    pub event_type: String,
    pub tenant_id: String,
    pub state: AuditState,
    /// Failure reason; absent for `Published` records.
    pub error_message: Option<String>,
    pub audit_date: DateTime<Utc>,
}

impl AuditMessage {
    /// Construct a record for `event`'s attempt, stamped now.
    pub fn new(
        event: &Event,
        tenant_id: impl Into<String>,
        state: AuditState,
        error_message: Option<String>,
    ) -> Self {
        Self {
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            tenant_id: tenant_id.into(),
            state,
            error_message,
            audit_date: Utc::now(),
        }
    }
}

/// Opaque append-only sink for audit records.
///
/// Implementations:
/// - `LogAuditSink`: structured log line per record
/// - `MockAuditSink`: In-memory mock for testing
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one record. Delivery is not guaranteed by this crate.
    async fn save(&self, message: AuditMessage) -> Result<()>;
}

/// Sink that emits each audit record as a structured log line.
#[derive(Debug, Default)]
pub struct LogAuditSink;

impl LogAuditSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn save(&self, message: AuditMessage) -> Result<()> {
        info!(
            event_id = %message.event_id,
            event_type = %message.event_type,
            tenant_id = %message.tenant_id,
            state = %message.state,
            error_message = message.error_message.as_deref().unwrap_or(""),
            "Audit record"
        );
        Ok(())
    }
}

/// Records publish outcomes without ever blocking or failing the caller.
///
/// `record` must be called exactly once per publish attempt, on whichever
/// branch the attempt takes.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    /// Create a recorder over the given sink.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record the outcome of one publish attempt, fire-and-forget.
    ///
    /// The sink write runs on its own task; its failure is logged and
    /// swallowed so the publish result resolves regardless.
    pub fn record(
        &self,
        event: &Event,
        tenant_id: &str,
        state: AuditState,
        error_message: Option<&str>,
    ) {
        let message = AuditMessage::new(
            event,
            tenant_id,
            state,
            error_message.map(str::to_string),
        );
        let sink = Arc::clone(&self.sink);

        tokio::spawn(async move {
            if let Err(e) = sink.save(message).await {
                warn!(error = %e, "Failed to save audit record");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        Event {
            id: "e1".to_string(),
            event_type: "RECORD_CREATED".to_string(),
            event_payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_message_carries_event_identity() {
        let message = AuditMessage::new(&event(), "t1", AuditState::Published, None);

        assert_eq!(message.event_id, "e1");
        assert_eq!(message.event_type, "RECORD_CREATED");
        assert_eq!(message.tenant_id, "t1");
        assert!(message.error_message.is_none());
    }

    #[tokio::test]
    async fn test_recorder_delivers_to_sink() {
        let sink = Arc::new(MockAuditSink::new());
        let recorder = AuditRecorder::new(sink.clone());

        recorder.record(&event(), "t1", AuditState::Published, None);
        sink.wait_for_records(1).await;

        let saved = sink.take_saved().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].state, AuditState::Published);
    }

    #[tokio::test]
    async fn test_recorder_swallows_sink_failure() {
        let sink = Arc::new(MockAuditSink::new());
        sink.set_fail_on_save(true).await;
        let recorder = AuditRecorder::new(sink.clone());

        // Must not panic or propagate; the spawned write fails quietly.
        recorder.record(&event(), "t1", AuditState::Rejected, Some("Event was not sent"));
        tokio::task::yield_now().await;
    }
}
