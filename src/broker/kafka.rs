//! Kafka broker implementation.
//!
//! Topic names arrive fully formed from the publishing pipeline; this
//! module only owns producer construction and the send itself.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use tracing::{debug, info};

use super::{BrokerError, BrokerSend, Result};
use crate::config::BrokerConfig;

/// Configuration for the Kafka producer connection.
#[derive(Clone, Debug)]
pub struct KafkaBrokerConfig {
    /// Kafka bootstrap servers (comma-separated).
    pub bootstrap_servers: String,
    /// SASL username (optional, for authenticated clusters).
    pub sasl_username: Option<String>,
    /// SASL password (optional, for authenticated clusters).
    pub sasl_password: Option<String>,
    /// SASL mechanism (PLAIN, SCRAM-SHA-256, SCRAM-SHA-512).
    pub sasl_mechanism: Option<String>,
    /// Security protocol (PLAINTEXT, SSL, SASL_PLAINTEXT, SASL_SSL).
    pub security_protocol: Option<String>,
    /// SSL CA certificate path (for SSL connections).
    pub ssl_ca_location: Option<String>,
}

impl KafkaBrokerConfig {
    /// Create a plaintext config.
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            sasl_username: None,
            sasl_password: None,
            sasl_mechanism: None,
            security_protocol: None,
            ssl_ca_location: None,
        }
    }

    /// Add SASL authentication.
    pub fn with_sasl(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        mechanism: impl Into<String>,
    ) -> Self {
        self.sasl_username = Some(username.into());
        self.sasl_password = Some(password.into());
        self.sasl_mechanism = Some(mechanism.into());
        self.security_protocol = Some("SASL_SSL".to_string());
        self
    }

    /// Set security protocol.
    pub fn with_security_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.security_protocol = Some(protocol.into());
        self
    }

    /// Set SSL CA certificate location.
    pub fn with_ssl_ca(mut self, ca_location: impl Into<String>) -> Self {
        self.ssl_ca_location = Some(ca_location.into());
        self
    }

    /// Build a ClientConfig for the producer.
    fn build_producer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);
        config.set("message.timeout.ms", "5000");
        config.set("acks", "all");
        config.set("enable.idempotence", "true");

        if let Some(ref protocol) = self.security_protocol {
            config.set("security.protocol", protocol);
        }
        if let Some(ref mechanism) = self.sasl_mechanism {
            config.set("sasl.mechanism", mechanism);
        }
        if let Some(ref username) = self.sasl_username {
            config.set("sasl.username", username);
        }
        if let Some(ref password) = self.sasl_password {
            config.set("sasl.password", password);
        }
        if let Some(ref ca_location) = self.ssl_ca_location {
            config.set("ssl.ca.location", ca_location);
        }

        config
    }
}

impl From<&BrokerConfig> for KafkaBrokerConfig {
    fn from(config: &BrokerConfig) -> Self {
        let mut kafka = KafkaBrokerConfig::new(&config.bootstrap_servers);

        if let (Some(user), Some(pass), Some(mechanism)) = (
            config.sasl_username.as_deref(),
            config.sasl_password.as_deref(),
            config.sasl_mechanism.as_deref(),
        ) {
            kafka = kafka.with_sasl(user, pass, mechanism);
        }
        if let Some(ref protocol) = config.security_protocol {
            kafka = kafka.with_security_protocol(protocol);
        }
        if let Some(ref ca) = config.ssl_ca_location {
            kafka = kafka.with_ssl_ca(ca);
        }

        kafka
    }
}

/// Kafka implementation of the broker send primitive.
///
/// One producer handle per process, shared across all tenants and event
/// types.
pub struct KafkaBroker {
    producer: FutureProducer,
}

impl KafkaBroker {
    /// Create a new Kafka broker handle.
    pub fn new(config: KafkaBrokerConfig) -> Result<Self> {
        let producer: FutureProducer = config
            .build_producer_config()
            .create()
            .map_err(|e| BrokerError::Connection(format!("Failed to create Kafka producer: {}", e)))?;

        info!(
            bootstrap_servers = %config.bootstrap_servers,
            "Connected to Kafka"
        );

        Ok(Self { producer })
    }
}

#[async_trait]
impl BrokerSend for KafkaBroker {
    async fn send(&self, topic: &str, payload: &str) -> Result<()> {
        let record = FutureRecord::<(), _>::to(topic).payload(payload);

        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| BrokerError::Send(e.to_string()))?;

        debug!(topic = %topic, "Delivered payload to Kafka");

        Ok(())
    }
}
