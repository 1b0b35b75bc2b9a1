//! Mock audit sink implementation for testing.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AuditError, AuditMessage, AuditSink, Result};

/// Mock audit sink that records messages in memory.
#[derive(Default)]
pub struct MockAuditSink {
    saved: RwLock<Vec<AuditMessage>>,
    fail_on_save: RwLock<bool>,
}

impl MockAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_save(&self, fail: bool) {
        *self.fail_on_save.write().await = fail;
    }

    pub async fn saved_count(&self) -> usize {
        self.saved.read().await.len()
    }

    pub async fn take_saved(&self) -> Vec<AuditMessage> {
        std::mem::take(&mut *self.saved.write().await)
    }

    /// Block until at least `count` records have arrived.
    ///
    /// Recording is fire-and-forget, so tests observing audit output need
    /// to wait out the spawned write.
    pub async fn wait_for_records(&self, count: usize) {
        for _ in 0..200 {
            if self.saved.read().await.len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!(
            "Timed out waiting for {} audit records, have {}",
            count,
            self.saved.read().await.len()
        );
    }
}

#[async_trait]
impl AuditSink for MockAuditSink {
    async fn save(&self, message: AuditMessage) -> Result<()> {
        if *self.fail_on_save.read().await {
            return Err(AuditError::Sink("Mock save failure".to_string()));
        }
        self.saved.write().await.push(message);
        Ok(())
    }
}
