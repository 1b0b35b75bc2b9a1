//! Mock broker implementation for testing.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BrokerError, BrokerSend, Result};

/// Mock broker that records sent messages in memory.
#[derive(Default)]
pub struct MockBroker {
    sent: RwLock<Vec<(String, String)>>,
    fail_on_send: RwLock<bool>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_send(&self, fail: bool) {
        *self.fail_on_send.write().await = fail;
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.read().await.len()
    }

    /// Drain recorded `(topic, payload)` pairs.
    pub async fn take_sent(&self) -> Vec<(String, String)> {
        std::mem::take(&mut *self.sent.write().await)
    }
}

#[async_trait]
impl BrokerSend for MockBroker {
    async fn send(&self, topic: &str, payload: &str) -> Result<()> {
        if *self.fail_on_send.read().await {
            return Err(BrokerError::Send("Mock send failure".to_string()));
        }
        self.sent
            .write()
            .await
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}
