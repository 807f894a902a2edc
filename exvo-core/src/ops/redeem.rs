//! Scan verification and redemption

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::VoucherOps;
use crate::codec::PayloadCodec;
use crate::error::{VoucherError, VoucherResult};
use crate::store::{BatchStore, TransitionPatch, VoucherStore};
use crate::types::voucher::{EventKind, LifecycleEvent, Voucher, VoucherStatus};

/// Redemption request
#[derive(Debug, Clone)]
pub struct UseRequest {
    pub serial_no: String,
    pub site_code: String,
    /// Explicit usage amount; defaults to the voucher's full amount. A value
    /// below the full amount records the remainder but still marks the
    /// voucher fully used.
    pub amount: Option<u64>,
    /// Override for the redemption timestamp (file uploads carry a date)
    pub used_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub actor: String,
}

/// Outcome of a scan-payload verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedScan {
    pub voucher: Voucher,
    /// Whether the voucher is currently redeemable (`issued`); authenticity
    /// and eligibility are separate checks
    pub redeemable: bool,
}

impl<S: VoucherStore + BatchStore> VoucherOps<S> {
    /// Verify a scanned payload: authenticity (signature), freshness
    /// (issuance timestamp) and then a status report for the eligibility
    /// decision. "Not found" and "invalid signature" stay distinct so
    /// operators can tell forged codes from stale data.
    pub async fn verify_scan(&self, payload: &str) -> VoucherResult<VerifiedScan> {
        let parsed = PayloadCodec::parse(payload)?;
        let voucher = self.load(&parsed.serial_no).await?;
        self.codec().verify(payload, &voucher)?;

        tracing::debug!(
            serial_no = %voucher.serial_no,
            status = %voucher.status,
            operation = "verify",
            "Scan payload verified"
        );
        Ok(VerifiedScan {
            redeemable: voucher.status == VoucherStatus::Issued,
            voucher,
        })
    }

    /// The `issued -> used` transition
    pub async fn register_use(&self, request: UseRequest) -> VoucherResult<Voucher> {
        if request.site_code.trim().is_empty() {
            return Err(VoucherError::Validation(
                "site_code must not be empty".to_string(),
            ));
        }

        let voucher = self.load(&request.serial_no).await?;

        let mut note = request.note.clone().filter(|n| !n.trim().is_empty());
        if let Some(amount) = request.amount {
            if amount == 0 {
                return Err(VoucherError::Validation(
                    "usage amount must be positive".to_string(),
                ));
            }
            if amount > voucher.amount {
                return Err(VoucherError::Validation(format!(
                    "usage amount {amount} exceeds voucher amount {}",
                    voucher.amount
                )));
            }
            if amount < voucher.amount {
                let remainder = voucher.amount - amount;
                let partial = format!(
                    "partial use: {amount} of {}, remainder {remainder}",
                    voucher.amount
                );
                note = Some(match note {
                    Some(n) => format!("{n}\n{partial}"),
                    None => partial,
                });
            }
        }

        let used_at = request.used_at.unwrap_or_else(Utc::now);
        let site = request.site_code.trim().to_string();
        let mut event = LifecycleEvent::new(EventKind::Used, &request.actor).with_site(&site);
        if let Some(n) = &note {
            event = event.with_note(n.clone());
        }
        let patch = TransitionPatch {
            new_status: VoucherStatus::Used,
            issued_at: None,
            used_at: Some(used_at),
            used_at_site: Some(site.clone()),
            append_note: note,
            event,
            attempted: "use",
        };
        let voucher = self
            .store()
            .transition(&voucher.id, VoucherStatus::Issued, patch)
            .await?;

        tracing::info!(
            serial_no = %voucher.serial_no,
            operation = "use",
            site = %site,
            "Voucher redeemed"
        );
        self.record_audit(
            "use",
            &request.actor,
            Some(&voucher.serial_no),
            format!("site {site}"),
        )
        .await;

        // Delivery failure must never look like a redemption failure
        if voucher.phone.is_some() {
            if let Err(e) = self.notify_sink().voucher_used(&voucher).await {
                tracing::warn!(
                    serial_no = %voucher.serial_no,
                    error = %e,
                    "Redemption notification failed"
                );
            }
        }

        Ok(voucher)
    }
}
