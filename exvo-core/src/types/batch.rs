//! Pickup batch: a named group of vouchers issued together for remote
//! (mobile) pickup through one shared access token
//!
//! A batch is created `generating` before any voucher exists, becomes
//! `completed` once its member vouchers are created, `failed` on an
//! unrecoverable error, and flips to `expired` lazily the first time it is
//! accessed past its expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque batch identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pickup batch status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Created; member vouchers not yet written
    Generating,
    /// All member vouchers created
    Completed,
    /// Unrecoverable error during creation
    Failed,
    /// Past expiry; set lazily on first post-expiry access
    Expired,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named set of vouchers behind one shared, expiring access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupBatch {
    pub id: BatchId,
    pub batch_name: String,
    /// Requested voucher count
    pub total_count: u32,
    /// Vouchers actually created
    pub generated_count: u32,
    pub status: BatchStatus,
    /// Opaque bearer token granting access until `expires_at`
    pub link_token: String,
    pub expires_at: DateTime<Utc>,
    pub download_count: u64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PickupBatch {
    pub fn new(
        batch_name: String,
        total_count: u32,
        link_token: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BatchId::new(),
            batch_name,
            total_count,
            generated_count: 0,
            status: BatchStatus::Generating,
            link_token,
            expires_at,
            download_count: 0,
            last_accessed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the batch is past its expiry at `now`; the status flip itself
    /// happens at the store on first post-expiry access
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
