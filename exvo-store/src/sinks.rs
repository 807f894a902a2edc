//! Audit and notification sink implementations

use async_trait::async_trait;
use tokio::sync::Mutex;

use exvo_core::store::{AuditSink, NotifyError, NotifySink};
use exvo_core::types::audit::AuditEntry;
use exvo_core::types::voucher::Voucher;

/// Audit sink that keeps entries in memory; inspectable in tests
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: AuditEntry) {
        self.entries.lock().await.push(entry);
    }
}

/// Notification sink that logs deliveries instead of sending SMS/email
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifySink for TracingNotifier {
    async fn voucher_used(&self, voucher: &Voucher) -> Result<(), NotifyError> {
        tracing::info!(
            serial_no = %voucher.serial_no,
            phone = voucher.phone.as_deref().unwrap_or("-"),
            operation = "notify",
            "Redemption notification dispatched"
        );
        Ok(())
    }
}
