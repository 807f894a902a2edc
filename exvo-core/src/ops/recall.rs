//! Recall, disposal and deletion

use super::VoucherOps;
use crate::error::{VoucherError, VoucherResult};
use crate::store::{BatchStore, TransitionPatch, VoucherStore};
use crate::types::voucher::{EventKind, LifecycleEvent, Voucher, VoucherStatus};

impl<S: VoucherStore + BatchStore> VoucherOps<S> {
    /// Withdraw an issued voucher (`issued -> recalled`), appending the
    /// reason to its notes
    pub async fn recall(
        &self,
        serial_no: &str,
        reason: &str,
        actor: &str,
    ) -> VoucherResult<Voucher> {
        let voucher = self.load(serial_no).await?;
        let reason = if reason.trim().is_empty() {
            "recalled"
        } else {
            reason.trim()
        };
        let note = format!("recall: {reason}");
        let patch = TransitionPatch {
            new_status: VoucherStatus::Recalled,
            issued_at: None,
            used_at: None,
            used_at_site: None,
            append_note: Some(note.clone()),
            event: LifecycleEvent::new(EventKind::Recalled, actor).with_note(reason),
            attempted: "recall",
        };
        let voucher = self
            .store()
            .transition(&voucher.id, VoucherStatus::Issued, patch)
            .await?;

        tracing::info!(serial_no = %voucher.serial_no, operation = "recall", "Voucher recalled");
        self.record_audit("recall", actor, Some(&voucher.serial_no), note)
            .await;

        Ok(voucher)
    }

    /// Administrative disposal from `registered` or `issued`
    pub async fn dispose(
        &self,
        serial_no: &str,
        reason: Option<&str>,
        actor: &str,
    ) -> VoucherResult<Voucher> {
        let voucher = self.load(serial_no).await?;
        let expected = match voucher.status {
            VoucherStatus::Registered | VoucherStatus::Issued => voucher.status,
            current => {
                return Err(VoucherError::InvalidStateTransition {
                    serial_no: voucher.serial_no,
                    current,
                    attempted: "dispose",
                })
            }
        };

        let mut event = LifecycleEvent::new(EventKind::Disposed, actor);
        if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
            event = event.with_note(reason.trim());
        }
        let patch = TransitionPatch {
            new_status: VoucherStatus::Disposed,
            issued_at: None,
            used_at: None,
            used_at_site: None,
            append_note: None,
            event,
            attempted: "dispose",
        };
        let voucher = self.store().transition(&voucher.id, expected, patch).await?;

        tracing::info!(serial_no = %voucher.serial_no, operation = "dispose", "Voucher disposed");
        self.record_audit("dispose", actor, Some(&voucher.serial_no), String::new())
            .await;

        Ok(voucher)
    }

    /// Physically delete a voucher. Used vouchers are refused by the store.
    pub async fn delete(&self, serial_no: &str, actor: &str) -> VoucherResult<()> {
        self.store().delete_by_serial(serial_no).await?;

        tracing::info!(serial_no, operation = "delete", "Voucher deleted");
        self.record_audit("delete", actor, Some(serial_no), String::new())
            .await;
        Ok(())
    }
}
