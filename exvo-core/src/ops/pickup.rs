//! Mobile pickup batches and link tokens

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::bulk::BulkReport;
use super::VoucherOps;
use crate::error::{VoucherError, VoucherResult};
use crate::store::{BatchStore, VoucherStore};
use crate::token::is_valid_token_format;
use crate::types::batch::{BatchStatus, PickupBatch};
use crate::types::voucher::{Voucher, VoucherDetails, VoucherStatus};

/// A freshly created pickup batch with its access URL and per-item results
#[derive(Debug, Clone)]
pub struct CreatedBatch {
    pub batch: PickupBatch,
    pub url: String,
    pub report: BulkReport,
}

/// A granted batch access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAccess {
    pub batch: PickupBatch,
    pub vouchers: Vec<Voucher>,
}

impl<S: VoucherStore + BatchStore> VoucherOps<S> {
    /// Create a named batch of vouchers for remote pickup behind one shared
    /// token.
    ///
    /// Business failures on individual items are isolated like any bulk
    /// operation; an unrecoverable store fault marks the batch `failed` and
    /// propagates.
    pub async fn create_pickup_batch(
        &self,
        batch_name: &str,
        items: Vec<VoucherDetails>,
        expiry_hours: Option<u32>,
        actor: &str,
    ) -> VoucherResult<CreatedBatch> {
        if batch_name.trim().is_empty() {
            return Err(VoucherError::Validation(
                "batch_name must not be empty".to_string(),
            ));
        }
        if items.is_empty() {
            return Err(VoucherError::Validation(
                "batch requires at least one voucher".to_string(),
            ));
        }

        let issued = self.tokens().issue(self.link_hours(expiry_hours));
        let batch = PickupBatch::new(
            batch_name.trim().to_string(),
            items.len() as u32,
            issued.token.clone(),
            issued.expires_at,
        );
        let batch = self.store().create_batch(batch).await?;

        let mut accepted: HashSet<String> = HashSet::new();
        let mut results = Vec::with_capacity(items.len());
        for (i, details) in items.iter().enumerate() {
            let reference = details
                .serial_no
                .clone()
                .unwrap_or_else(|| format!("row {}", i + 1));
            match self
                .create_issued_row(details, &mut accepted, Some(batch.id), actor)
                .await
            {
                Ok(voucher) => results.push(super::RowResult {
                    reference: voucher.serial_no,
                    success: true,
                    code: None,
                    message: "issued".to_string(),
                }),
                Err(VoucherError::Storage(msg)) => {
                    let generated = results.iter().filter(|r| r.success).count() as u32;
                    let _ = self
                        .store()
                        .finish_batch(&batch.id, BatchStatus::Failed, generated)
                        .await;
                    tracing::error!(
                        batch_id = %batch.id,
                        error = %msg,
                        "Pickup batch generation failed"
                    );
                    return Err(VoucherError::Storage(msg));
                }
                Err(e) => results.push(super::RowResult {
                    reference,
                    success: false,
                    code: Some(e.code().to_string()),
                    message: e.to_string(),
                }),
            }
        }

        let report = BulkReport::from_results(results);
        let batch = self
            .store()
            .finish_batch(&batch.id, BatchStatus::Completed, report.summary.success)
            .await?;

        tracing::info!(
            batch_id = %batch.id,
            count = report.summary.total,
            error = report.summary.error,
            operation = "batch_create",
            "Pickup batch created"
        );
        self.record_audit(
            "batch_create",
            actor,
            None,
            format!(
                "batch {} ({} of {} vouchers)",
                batch.batch_name, report.summary.success, report.summary.total
            ),
        )
        .await;

        Ok(CreatedBatch {
            batch,
            url: issued.url,
            report,
        })
    }

    /// Resolve a bearer token to its batch and vouchers.
    ///
    /// Expiry is checked lazily: the first post-expiry access flips the
    /// batch to `expired` and is denied.
    pub async fn access_batch(&self, token: &str) -> VoucherResult<BatchAccess> {
        if !is_valid_token_format(token) {
            return Err(VoucherError::Validation(
                "malformed access token".to_string(),
            ));
        }

        let batch = self
            .store()
            .get_batch_by_token(token)
            .await?
            .ok_or_else(|| VoucherError::NotFound("access link not found".to_string()))?;

        if batch.status != BatchStatus::Expired && batch.is_expired_at(Utc::now()) {
            self.store().mark_batch_expired(&batch.id).await?;
            tracing::info!(batch_id = %batch.id, "Pickup batch expired on access");
            return Err(VoucherError::LinkExpired);
        }

        match batch.status {
            BatchStatus::Expired => Err(VoucherError::LinkExpired),
            BatchStatus::Generating => Err(VoucherError::Validation(
                "batch is still generating".to_string(),
            )),
            BatchStatus::Failed => Err(VoucherError::Validation(
                "batch generation failed".to_string(),
            )),
            BatchStatus::Completed => {
                let batch = self.store().record_batch_access(&batch.id).await?;
                let vouchers = self.store().list_by_batch(&batch.id).await?;
                tracing::debug!(
                    batch_id = %batch.id,
                    count = vouchers.len(),
                    operation = "batch_access",
                    "Pickup batch accessed"
                );
                Ok(BatchAccess { batch, vouchers })
            }
        }
    }

    /// Per-voucher variant of the access link: attach a fresh token to one
    /// issued voucher
    pub async fn issue_voucher_link(
        &self,
        serial_no: &str,
        expiry_hours: Option<u32>,
        actor: &str,
    ) -> VoucherResult<(Voucher, String)> {
        let voucher = self.load(serial_no).await?;
        if voucher.status != VoucherStatus::Issued {
            return Err(VoucherError::InvalidStateTransition {
                serial_no: voucher.serial_no,
                current: voucher.status,
                attempted: "link",
            });
        }

        let issued = self.tokens().issue(self.link_hours(expiry_hours));
        let voucher = self
            .store()
            .set_link(&voucher.id, issued.token.clone(), issued.expires_at)
            .await?;

        tracing::info!(serial_no = %voucher.serial_no, operation = "link", "Voucher link issued");
        self.record_audit("link", actor, Some(&voucher.serial_no), String::new())
            .await;

        Ok((voucher, issued.url))
    }
}
