//! # exvo-core
//!
//! Core domain logic for the exchange voucher service:
//! - Voucher and pickup-batch entities with their lifecycle state machines
//! - Serial number generation
//! - Signed scan-payload codec (HMAC) for offline authenticity checks
//! - Secure link tokens for time-limited mobile access
//! - CSV upload ingestion with encoding and delimiter detection
//! - Bulk operations with per-row failure isolation
//!
//! Persistence, message delivery, and rendering are external collaborators
//! reached through the traits in [`store`].

pub mod barcode;
pub mod codec;
pub mod csv;
pub mod error;
pub mod ops;
pub mod serial;
pub mod store;
pub mod token;
pub mod types;

pub use codec::PayloadCodec;
pub use error::{VoucherError, VoucherResult};
pub use ops::{
    BulkOutcome, BulkRecallItem, BulkReport, BulkSummary, BulkUseItem, OpsConfig, RowResult,
    UseRequest, VoucherOps,
};
pub use store::{AuditSink, BatchStore, NotifySink, TransitionPatch, VoucherStore};
pub use token::{IssuedToken, LinkTokenIssuer};
pub use types::audit::AuditEntry;
pub use types::batch::{BatchId, BatchStatus, PickupBatch};
pub use types::voucher::{
    EventKind, LifecycleEvent, Voucher, VoucherDetails, VoucherId, VoucherStatus,
};
