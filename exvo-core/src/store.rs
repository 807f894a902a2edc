//! Store and collaborator interfaces
//!
//! The relational store, audit trail and SMS/email delivery are external
//! collaborators; the core reaches them through the traits here. Every
//! status change goes through [`VoucherStore::transition`], a single
//! conditional update: the store applies the patch only while the voucher
//! still has the expected status, and reports the actual status otherwise.
//! "At most one successful `issued -> used`" rests on that contract, not on
//! an application-level lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::VoucherResult;
use crate::types::audit::AuditEntry;
use crate::types::batch::{BatchId, BatchStatus, PickupBatch};
use crate::types::voucher::{LifecycleEvent, Voucher, VoucherId, VoucherStatus};

/// Data applied by a status transition
#[derive(Debug, Clone)]
pub struct TransitionPatch {
    pub new_status: VoucherStatus,
    pub issued_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_at_site: Option<String>,
    pub append_note: Option<String>,
    pub event: LifecycleEvent,
    /// Verb used in `InvalidStateTransition` messages when the precondition
    /// no longer holds
    pub attempted: &'static str,
}

impl TransitionPatch {
    /// Apply this patch to a voucher the store has already checked
    pub fn apply_to(self, voucher: &mut Voucher) {
        voucher.status = self.new_status;
        if let Some(at) = self.issued_at {
            voucher.issued_at = Some(at);
        }
        if let Some(at) = self.used_at {
            voucher.used_at = Some(at);
        }
        if let Some(site) = self.used_at_site {
            voucher.used_at_site = Some(site);
        }
        if let Some(note) = self.append_note {
            voucher.append_note(&note);
        }
        voucher.events.push(self.event);
    }
}

/// Voucher persistence interface
#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// Insert vouchers all-or-nothing; `DuplicateSerial` if any serial is
    /// already taken (or repeated within the slice)
    async fn insert(&self, vouchers: Vec<Voucher>) -> VoucherResult<Vec<Voucher>>;

    async fn get(&self, id: &VoucherId) -> VoucherResult<Option<Voucher>>;

    async fn get_by_serial(&self, serial_no: &str) -> VoucherResult<Option<Voucher>>;

    async fn serial_exists(&self, serial_no: &str) -> VoucherResult<bool>;

    /// Apply `patch` only while the voucher still has `expected` status;
    /// otherwise fail with `InvalidStateTransition` carrying the actual
    /// current status. Never a silent no-op.
    async fn transition(
        &self,
        id: &VoucherId,
        expected: VoucherStatus,
        patch: TransitionPatch,
    ) -> VoucherResult<Voucher>;

    /// Attach a per-voucher mobile access link
    async fn set_link(
        &self,
        id: &VoucherId,
        token: String,
        expires_at: DateTime<Utc>,
    ) -> VoucherResult<Voucher>;

    /// Delete a voucher; must refuse while the voucher is `used`
    async fn delete_by_serial(&self, serial_no: &str) -> VoucherResult<()>;

    async fn list_by_batch(&self, batch_id: &BatchId) -> VoucherResult<Vec<Voucher>>;
}

/// Pickup batch persistence interface
#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn create_batch(&self, batch: PickupBatch) -> VoucherResult<PickupBatch>;

    async fn get_batch(&self, id: &BatchId) -> VoucherResult<Option<PickupBatch>>;

    async fn get_batch_by_token(&self, token: &str) -> VoucherResult<Option<PickupBatch>>;

    /// Record the terminal generation outcome (`Completed` or `Failed`) and
    /// the number of vouchers actually created
    async fn finish_batch(
        &self,
        id: &BatchId,
        status: BatchStatus,
        generated_count: u32,
    ) -> VoucherResult<PickupBatch>;

    /// Lazy expiry flip on first post-expiry access
    async fn mark_batch_expired(&self, id: &BatchId) -> VoucherResult<PickupBatch>;

    /// Count an access: bump `download_count`, stamp `last_accessed_at`
    async fn record_batch_access(&self, id: &BatchId) -> VoucherResult<PickupBatch>;
}

/// Append-only audit trail, fire-and-forget: implementations swallow their
/// own failures; a lost audit record never rolls back the mutation
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry);
}

/// Notification delivery failure
#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// SMS/email delivery, invoked after a successful redemption when contact
/// details are on file; failures are logged by the caller, never propagated
#[async_trait]
pub trait NotifySink: Send + Sync {
    async fn voucher_used(&self, voucher: &Voucher) -> Result<(), NotifyError>;
}
