//! In-memory store implementation
//!
//! Thread-safe maps behind one `RwLock`; conditional status updates happen
//! under the write lock, so the compare-and-set contract of
//! [`VoucherStore::transition`] is genuinely atomic here.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use exvo_core::store::{BatchStore, TransitionPatch, VoucherStore};
use exvo_core::types::batch::{BatchId, BatchStatus, PickupBatch};
use exvo_core::types::voucher::{Voucher, VoucherId, VoucherStatus};
use exvo_core::{VoucherError, VoucherResult};

#[derive(Debug, Default)]
struct Inner {
    vouchers: HashMap<VoucherId, Voucher>,
    serial_index: HashMap<String, VoucherId>,
    batches: HashMap<BatchId, PickupBatch>,
    token_index: HashMap<String, BatchId>,
}

/// In-memory store for development and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all data
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.vouchers.clear();
        inner.serial_index.clear();
        inner.batches.clear();
        inner.token_index.clear();
    }

    pub async fn voucher_count(&self) -> usize {
        self.inner.read().await.vouchers.len()
    }
}

#[async_trait]
impl VoucherStore for MemoryStore {
    async fn insert(&self, vouchers: Vec<Voucher>) -> VoucherResult<Vec<Voucher>> {
        let mut inner = self.inner.write().await;

        let mut seen = std::collections::HashSet::new();
        for voucher in &vouchers {
            if inner.serial_index.contains_key(&voucher.serial_no)
                || !seen.insert(voucher.serial_no.clone())
            {
                return Err(VoucherError::DuplicateSerial(voucher.serial_no.clone()));
            }
        }

        for voucher in &vouchers {
            inner
                .serial_index
                .insert(voucher.serial_no.clone(), voucher.id);
            inner.vouchers.insert(voucher.id, voucher.clone());
        }
        Ok(vouchers)
    }

    async fn get(&self, id: &VoucherId) -> VoucherResult<Option<Voucher>> {
        Ok(self.inner.read().await.vouchers.get(id).cloned())
    }

    async fn get_by_serial(&self, serial_no: &str) -> VoucherResult<Option<Voucher>> {
        let inner = self.inner.read().await;
        Ok(inner
            .serial_index
            .get(serial_no)
            .and_then(|id| inner.vouchers.get(id))
            .cloned())
    }

    async fn serial_exists(&self, serial_no: &str) -> VoucherResult<bool> {
        Ok(self.inner.read().await.serial_index.contains_key(serial_no))
    }

    async fn transition(
        &self,
        id: &VoucherId,
        expected: VoucherStatus,
        patch: TransitionPatch,
    ) -> VoucherResult<Voucher> {
        let mut inner = self.inner.write().await;
        let voucher = inner
            .vouchers
            .get_mut(id)
            .ok_or_else(|| VoucherError::NotFound(format!("voucher {id} not found")))?;

        if voucher.status != expected {
            return Err(VoucherError::InvalidStateTransition {
                serial_no: voucher.serial_no.clone(),
                current: voucher.status,
                attempted: patch.attempted,
            });
        }

        patch.apply_to(voucher);
        Ok(voucher.clone())
    }

    async fn set_link(
        &self,
        id: &VoucherId,
        token: String,
        expires_at: DateTime<Utc>,
    ) -> VoucherResult<Voucher> {
        let mut inner = self.inner.write().await;
        let voucher = inner
            .vouchers
            .get_mut(id)
            .ok_or_else(|| VoucherError::NotFound(format!("voucher {id} not found")))?;
        voucher.mobile_link_token = Some(token);
        voucher.link_expires_at = Some(expires_at);
        Ok(voucher.clone())
    }

    async fn delete_by_serial(&self, serial_no: &str) -> VoucherResult<()> {
        let mut inner = self.inner.write().await;
        let id = *inner
            .serial_index
            .get(serial_no)
            .ok_or_else(|| VoucherError::NotFound(format!("voucher {serial_no} not found")))?;

        let status = inner
            .vouchers
            .get(&id)
            .map(|v| v.status)
            .ok_or_else(|| VoucherError::Storage("serial index out of sync".to_string()))?;
        if status == VoucherStatus::Used {
            return Err(VoucherError::Validation(
                "used vouchers cannot be deleted".to_string(),
            ));
        }

        inner.vouchers.remove(&id);
        inner.serial_index.remove(serial_no);
        Ok(())
    }

    async fn list_by_batch(&self, batch_id: &BatchId) -> VoucherResult<Vec<Voucher>> {
        let inner = self.inner.read().await;
        let mut vouchers: Vec<Voucher> = inner
            .vouchers
            .values()
            .filter(|v| v.batch_id.as_ref() == Some(batch_id))
            .cloned()
            .collect();
        vouchers.sort_by(|a, b| a.serial_no.cmp(&b.serial_no));
        Ok(vouchers)
    }
}

#[async_trait]
impl BatchStore for MemoryStore {
    async fn create_batch(&self, batch: PickupBatch) -> VoucherResult<PickupBatch> {
        let mut inner = self.inner.write().await;
        inner.token_index.insert(batch.link_token.clone(), batch.id);
        inner.batches.insert(batch.id, batch.clone());
        Ok(batch)
    }

    async fn get_batch(&self, id: &BatchId) -> VoucherResult<Option<PickupBatch>> {
        Ok(self.inner.read().await.batches.get(id).cloned())
    }

    async fn get_batch_by_token(&self, token: &str) -> VoucherResult<Option<PickupBatch>> {
        let inner = self.inner.read().await;
        Ok(inner
            .token_index
            .get(token)
            .and_then(|id| inner.batches.get(id))
            .cloned())
    }

    async fn finish_batch(
        &self,
        id: &BatchId,
        status: BatchStatus,
        generated_count: u32,
    ) -> VoucherResult<PickupBatch> {
        let mut inner = self.inner.write().await;
        let batch = inner
            .batches
            .get_mut(id)
            .ok_or_else(|| VoucherError::NotFound(format!("batch {id} not found")))?;
        batch.status = status;
        batch.generated_count = generated_count;
        Ok(batch.clone())
    }

    async fn mark_batch_expired(&self, id: &BatchId) -> VoucherResult<PickupBatch> {
        let mut inner = self.inner.write().await;
        let batch = inner
            .batches
            .get_mut(id)
            .ok_or_else(|| VoucherError::NotFound(format!("batch {id} not found")))?;
        batch.status = BatchStatus::Expired;
        Ok(batch.clone())
    }

    async fn record_batch_access(&self, id: &BatchId) -> VoucherResult<PickupBatch> {
        let mut inner = self.inner.write().await;
        let batch = inner
            .batches
            .get_mut(id)
            .ok_or_else(|| VoucherError::NotFound(format!("batch {id} not found")))?;
        batch.download_count += 1;
        batch.last_accessed_at = Some(Utc::now());
        Ok(batch.clone())
    }
}
