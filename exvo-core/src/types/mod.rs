//! Domain types for the voucher service

pub mod audit;
pub mod batch;
pub mod voucher;

pub use audit::AuditEntry;
pub use batch::{BatchId, BatchStatus, PickupBatch};
pub use voucher::{EventKind, LifecycleEvent, Voucher, VoucherDetails, VoucherId, VoucherStatus};
