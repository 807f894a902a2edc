//! Registration and issuance

use std::collections::HashSet;

use chrono::Utc;

use super::VoucherOps;
use crate::error::{VoucherError, VoucherResult};
use crate::store::{BatchStore, TransitionPatch, VoucherStore};
use crate::types::voucher::{
    EventKind, LifecycleEvent, Voucher, VoucherDetails, VoucherStatus,
};

impl<S: VoucherStore + BatchStore> VoucherOps<S> {
    /// Create a voucher at `registered`, with a supplied or generated serial
    pub async fn register(&self, details: VoucherDetails, actor: &str) -> VoucherResult<Voucher> {
        details.validate()?;
        let serial_no = match &details.serial_no {
            Some(serial) => {
                let serial = serial.trim().to_string();
                if self.store().serial_exists(&serial).await? {
                    return Err(VoucherError::DuplicateSerial(serial));
                }
                serial
            }
            None => self.unique_serial(&HashSet::new()).await?,
        };

        let voucher = Voucher::new(serial_no, &details);
        let mut inserted = self.store().insert(vec![voucher]).await?;
        let voucher = inserted
            .pop()
            .ok_or_else(|| VoucherError::Storage("insert returned no rows".to_string()))?;

        tracing::info!(
            serial_no = %voucher.serial_no,
            operation = "register",
            "Voucher registered"
        );
        self.record_audit(
            "register",
            actor,
            Some(&voucher.serial_no),
            format!("amount {} for {}", voucher.amount, voucher.association),
        )
        .await;

        Ok(voucher)
    }

    /// Promote `registered -> issued` and sign the scan payload
    pub async fn issue(&self, serial_no: &str, actor: &str) -> VoucherResult<(Voucher, String)> {
        let voucher = self.load(serial_no).await?;
        let now = Utc::now();
        let patch = TransitionPatch {
            new_status: VoucherStatus::Issued,
            issued_at: Some(now),
            used_at: None,
            used_at_site: None,
            append_note: None,
            event: LifecycleEvent::new(EventKind::Issued, actor),
            attempted: "issue",
        };
        let voucher = self
            .store()
            .transition(&voucher.id, VoucherStatus::Registered, patch)
            .await?;
        let payload = self.codec().encode(&voucher)?;

        tracing::info!(serial_no = %voucher.serial_no, operation = "issue", "Voucher issued");
        self.record_audit("issue", actor, Some(&voucher.serial_no), String::new())
            .await;

        Ok((voucher, payload))
    }

    /// Re-sign an issued voucher with a fresh issuance timestamp.
    ///
    /// Payloads printed before the reissue stop verifying (freshness check),
    /// which is the point: a reprint supersedes every earlier code.
    pub async fn reissue(&self, serial_no: &str, actor: &str) -> VoucherResult<(Voucher, String)> {
        let voucher = self.load(serial_no).await?;
        let now = Utc::now();
        let patch = TransitionPatch {
            new_status: VoucherStatus::Issued,
            issued_at: Some(now),
            used_at: None,
            used_at_site: None,
            append_note: None,
            event: LifecycleEvent::new(EventKind::Reissued, actor),
            attempted: "reissue",
        };
        let voucher = self
            .store()
            .transition(&voucher.id, VoucherStatus::Issued, patch)
            .await?;
        let payload = self.codec().encode(&voucher)?;

        tracing::info!(serial_no = %voucher.serial_no, operation = "reissue", "Voucher reissued");
        self.record_audit("reissue", actor, Some(&voucher.serial_no), String::new())
            .await;

        Ok((voucher, payload))
    }
}
