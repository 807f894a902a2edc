//! Data Transfer Objects for API requests and responses

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use exvo_core::{BulkReport, BulkSummary, PickupBatch, RowResult, Voucher, VoucherDetails};

// ============ Voucher DTOs ============

/// Register (or directly describe) a voucher
#[derive(Debug, Deserialize)]
pub struct VoucherRequest {
    /// Explicit serial number; generated when absent
    pub serial_no: Option<String>,
    /// Face value in currency minor units
    pub amount: u64,
    /// Issuing association
    pub association: String,
    pub member_id: String,
    pub name: String,
    /// Date of birth, `YYYY-MM-DD`
    pub dob: NaiveDate,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl From<VoucherRequest> for VoucherDetails {
    fn from(req: VoucherRequest) -> Self {
        Self {
            serial_no: req.serial_no,
            amount: req.amount,
            association: req.association,
            member_id: req.member_id,
            name: req.name,
            date_of_birth: req.dob,
            phone: req.phone,
            notes: req.notes,
        }
    }
}

/// Voucher response
#[derive(Debug, Serialize)]
pub struct VoucherResponse {
    pub serial_no: String,
    pub amount: u64,
    pub association: String,
    pub member_id: String,
    pub name: String,
    pub dob: NaiveDate,
    pub phone: Option<String>,
    pub status: String,
    pub issued_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_at_site: Option<String>,
    pub notes: String,
    pub batch_id: Option<String>,
    pub mobile_link_token: Option<String>,
    pub link_expires_at: Option<DateTime<Utc>>,
}

pub fn voucher_to_response(voucher: &Voucher) -> VoucherResponse {
    VoucherResponse {
        serial_no: voucher.serial_no.clone(),
        amount: voucher.amount,
        association: voucher.association.clone(),
        member_id: voucher.member_id.clone(),
        name: voucher.name.clone(),
        dob: voucher.date_of_birth,
        phone: voucher.phone.clone(),
        status: voucher.status.as_str().to_string(),
        issued_at: voucher.issued_at,
        used_at: voucher.used_at,
        used_at_site: voucher.used_at_site.clone(),
        notes: voucher.notes.clone(),
        batch_id: voucher.batch_id.map(|id| id.to_string()),
        mobile_link_token: voucher.mobile_link_token.clone(),
        link_expires_at: voucher.link_expires_at,
    }
}

/// Issue / reissue response: the voucher plus its signed scan payload
#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub voucher: VoucherResponse,
    /// Signed payload to embed in the printed scan code
    pub payload: String,
    /// CODE128 (set B) check symbol for the payload
    pub barcode_checksum: Option<u8>,
}

/// Redeem request
#[derive(Debug, Deserialize)]
pub struct UseVoucherRequest {
    /// Redemption site
    pub site_code: String,
    /// Explicit usage amount; defaults to the full voucher amount
    pub amount: Option<u64>,
    pub notes: Option<String>,
}

/// Recall request
#[derive(Debug, Deserialize)]
pub struct RecallRequest {
    pub reason: Option<String>,
}

/// Dispose request
#[derive(Debug, Deserialize)]
pub struct DisposeRequest {
    pub reason: Option<String>,
}

/// Scan verification request
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub payload: String,
}

/// Scan verification response
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Payload is authentic for the voucher's current issuance
    pub valid: bool,
    /// Voucher is currently redeemable (`issued`)
    pub redeemable: bool,
    pub serial_no: String,
    pub status: String,
}

/// Per-voucher mobile link request
#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub expires_in_hours: Option<u32>,
}

/// Per-voucher mobile link response
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub serial_no: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

// ============ Bulk DTOs ============

/// Bulk issue request: references to registered vouchers
#[derive(Debug, Deserialize)]
pub struct BulkIssueRequest {
    pub items: Vec<BulkIssueRef>,
}

#[derive(Debug, Deserialize)]
pub struct BulkIssueRef {
    pub serial_no: String,
}

/// Bulk redeem request
#[derive(Debug, Deserialize)]
pub struct BulkUseRequest {
    pub items: Vec<BulkUseRef>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUseRef {
    pub serial_no: String,
    pub site_code: String,
    pub amount: Option<u64>,
    pub notes: Option<String>,
}

/// Bulk recall request (admin-only)
#[derive(Debug, Deserialize)]
pub struct BulkRecallRequest {
    pub items: Vec<BulkRecallRef>,
}

#[derive(Debug, Deserialize)]
pub struct BulkRecallRef {
    pub serial_no: String,
    pub reason: Option<String>,
}

/// Bulk operation response
#[derive(Debug, Serialize)]
pub struct BulkResponse {
    /// True only when every row succeeded
    pub success: bool,
    pub summary: BulkSummary,
    pub results: Vec<RowResult>,
}

impl From<BulkReport> for BulkResponse {
    fn from(report: BulkReport) -> Self {
        Self {
            success: report.summary.error == 0,
            summary: report.summary,
            results: report.results,
        }
    }
}

// ============ Pickup batch DTOs ============

/// Create a pickup batch
#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    pub batch_name: String,
    pub expires_in_hours: Option<u32>,
    pub items: Vec<VoucherRequest>,
}

/// Pickup batch response
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub id: String,
    pub batch_name: String,
    pub total_count: u32,
    pub generated_count: u32,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub download_count: u64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub fn batch_to_response(batch: &PickupBatch) -> BatchResponse {
    BatchResponse {
        id: batch.id.to_string(),
        batch_name: batch.batch_name.clone(),
        total_count: batch.total_count,
        generated_count: batch.generated_count,
        status: batch.status.as_str().to_string(),
        expires_at: batch.expires_at,
        download_count: batch.download_count,
        last_accessed_at: batch.last_accessed_at,
        created_at: batch.created_at,
    }
}

/// Pickup batch creation response
#[derive(Debug, Serialize)]
pub struct BatchCreatedResponse {
    pub batch: BatchResponse,
    /// Shared mobile access URL
    pub url: String,
    pub summary: BulkSummary,
    pub results: Vec<RowResult>,
}

/// Granted batch access
#[derive(Debug, Serialize)]
pub struct BatchAccessResponse {
    pub batch: BatchResponse,
    pub vouchers: Vec<VoucherResponse>,
}
