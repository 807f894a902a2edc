//! Operations layer
//!
//! [`VoucherOps`] drives the voucher state machine, the pickup-batch flow
//! and the bulk orchestrator generically over a store implementation. Each
//! operation family lives in its own module:
//! - [`issue`]: register, issue, reissue
//! - [`redeem`]: scan verification and redemption
//! - [`recall`]: recall, dispose, delete
//! - [`bulk`]: many-row orchestration with per-row failure isolation
//! - [`pickup`]: mobile pickup batches and link tokens

mod bulk;
mod issue;
mod pickup;
mod recall;
mod redeem;

pub use bulk::{
    parse_issue_csv, parse_use_csv, BulkOutcome, BulkRecallItem, BulkReport, BulkSummary,
    BulkUseItem, RowResult,
};
pub use pickup::{BatchAccess, CreatedBatch};
pub use redeem::{UseRequest, VerifiedScan};

use std::collections::HashSet;
use std::sync::Arc;

use crate::codec::PayloadCodec;
use crate::error::{VoucherError, VoucherResult};
use crate::serial;
use crate::store::{AuditSink, BatchStore, NotifySink, VoucherStore};
use crate::token::LinkTokenIssuer;
use crate::types::audit::AuditEntry;
use crate::types::voucher::Voucher;

/// Operations configuration
#[derive(Debug, Clone)]
pub struct OpsConfig {
    /// Server-held HMAC secret for the scan-payload codec
    pub payload_secret: Vec<u8>,
    /// Base URL used when building mobile access links
    pub base_url: String,
    /// Retry budget for unique serial generation
    pub serial_attempts: u32,
    /// Link validity when the caller does not supply one
    pub default_link_hours: u32,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            payload_secret: b"insecure-dev-secret".to_vec(),
            base_url: "http://localhost:3000".to_string(),
            serial_attempts: 100,
            default_link_hours: 72,
        }
    }
}

/// Voucher operations over a store `S`
pub struct VoucherOps<S> {
    store: Arc<S>,
    audit: Arc<dyn AuditSink>,
    notify: Arc<dyn NotifySink>,
    codec: PayloadCodec,
    tokens: LinkTokenIssuer,
    config: OpsConfig,
}

impl<S: VoucherStore + BatchStore> VoucherOps<S> {
    pub fn new(
        store: Arc<S>,
        audit: Arc<dyn AuditSink>,
        notify: Arc<dyn NotifySink>,
        config: OpsConfig,
    ) -> Self {
        let codec = PayloadCodec::new(config.payload_secret.clone());
        let tokens = LinkTokenIssuer::new(config.base_url.clone());
        Self {
            store,
            audit,
            notify,
            codec,
            tokens,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn codec(&self) -> &PayloadCodec {
        &self.codec
    }

    /// Fetch a voucher by serial number
    pub async fn get(&self, serial_no: &str) -> VoucherResult<Voucher> {
        self.load(serial_no).await
    }

    pub(crate) async fn load(&self, serial_no: &str) -> VoucherResult<Voucher> {
        self.store
            .get_by_serial(serial_no)
            .await?
            .ok_or_else(|| VoucherError::NotFound(format!("voucher {serial_no} not found")))
    }

    /// Generate a serial that is free both in the store and among serials
    /// already accepted in the current request, within the retry budget
    pub(crate) async fn unique_serial(&self, taken: &HashSet<String>) -> VoucherResult<String> {
        for _ in 0..self.config.serial_attempts {
            let candidate = serial::generate();
            if taken.contains(&candidate) {
                continue;
            }
            if !self.store.serial_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(VoucherError::GenerationExhausted {
            attempts: self.config.serial_attempts,
        })
    }

    pub(crate) fn link_hours(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.config.default_link_hours)
    }

    pub(crate) fn tokens(&self) -> &LinkTokenIssuer {
        &self.tokens
    }

    pub(crate) fn notify_sink(&self) -> &Arc<dyn NotifySink> {
        &self.notify
    }

    pub(crate) async fn record_audit(
        &self,
        action: &str,
        actor: &str,
        serial_no: Option<&str>,
        details: String,
    ) {
        let mut entry = AuditEntry::new(action, actor).with_details(details);
        if let Some(serial) = serial_no {
            entry = entry.with_serial(serial);
        }
        self.audit.record(entry).await;
    }
}
