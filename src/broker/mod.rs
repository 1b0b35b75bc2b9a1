//! Broker send primitive.
//!
//! This module contains:
//! - `BrokerSend` trait: the opaque ack/error send primitive the
//!   publishing pipeline hands serialized events to
//! - Implementations: Kafka, Mock

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::BrokerConfig;

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod mock;

#[cfg(feature = "kafka")]
pub use kafka::{KafkaBroker, KafkaBrokerConfig};
pub use mock::MockBroker;

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Errors that can occur during broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Send failed: {0}")]
    Send(String),
}

/// Opaque send primitive: deliver one serialized payload to one topic.
///
/// Implementations:
/// - `KafkaBroker`: Kafka via rdkafka
/// - `MockBroker`: In-memory mock for testing
///
/// Returns on broker acknowledgment; an `Err` is a negative ack. The
/// primitive performs no retries of its own.
#[async_trait]
pub trait BrokerSend: Send + Sync {
    /// Deliver `payload` to `topic`, resolving once the broker acks.
    async fn send(&self, topic: &str, payload: &str) -> Result<()>;
}

/// Initialize the broker send primitive from configuration.
///
/// Requires the corresponding feature to be enabled:
/// - Kafka: `--features kafka`
#[allow(unused_variables)]
pub async fn init_broker(
    config: &BrokerConfig,
) -> std::result::Result<Arc<dyn BrokerSend>, Box<dyn std::error::Error + Send + Sync>> {
    #[cfg(feature = "kafka")]
    {
        let kafka_config = KafkaBrokerConfig::from(config);
        let broker = KafkaBroker::new(kafka_config)?;
        tracing::info!(broker_type = "kafka", "Broker initialized");
        Ok(Arc::new(broker))
    }

    #[cfg(not(feature = "kafka"))]
    {
        Err("Kafka support requires the 'kafka' feature. Rebuild with --features kafka".into())
    }
}
