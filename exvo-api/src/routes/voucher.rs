//! Single-voucher endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use exvo_core::barcode;
use exvo_core::UseRequest;

use crate::dto::{
    voucher_to_response, DisposeRequest, IssueResponse, LinkRequest, LinkResponse, RecallRequest,
    UseVoucherRequest, VerifyRequest, VerifyResponse, VoucherRequest, VoucherResponse,
};
use crate::error::ApiResult;
use crate::routes::{actor_from, require_admin};
use crate::state::AppState;

/// Register a new voucher
pub async fn register_voucher(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<VoucherRequest>,
) -> ApiResult<(StatusCode, Json<VoucherResponse>)> {
    let actor = actor_from(&headers);
    let voucher = state.ops.register(req.into(), &actor).await?;
    Ok((StatusCode::CREATED, Json(voucher_to_response(&voucher))))
}

/// Get a voucher by serial number
pub async fn get_voucher(
    State(state): State<AppState>,
    Path(serial_no): Path<String>,
) -> ApiResult<Json<VoucherResponse>> {
    let voucher = state.ops.get(&serial_no).await?;
    Ok(Json(voucher_to_response(&voucher)))
}

/// Delete a voucher; refused while the voucher is used
pub async fn delete_voucher(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(serial_no): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let actor = actor_from(&headers);
    state.ops.delete(&serial_no, &actor).await?;
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

/// Issue a registered voucher and return its signed scan payload
pub async fn issue_voucher(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(serial_no): Path<String>,
) -> ApiResult<Json<IssueResponse>> {
    let actor = actor_from(&headers);
    let (voucher, payload) = state.ops.issue(&serial_no, &actor).await?;
    Ok(Json(IssueResponse {
        voucher: voucher_to_response(&voucher),
        barcode_checksum: barcode::code128_checksum(&payload),
        payload,
    }))
}

/// Re-sign an issued voucher with a fresh issuance timestamp, superseding
/// previously printed codes
pub async fn reissue_voucher(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(serial_no): Path<String>,
) -> ApiResult<Json<IssueResponse>> {
    let actor = actor_from(&headers);
    let (voucher, payload) = state.ops.reissue(&serial_no, &actor).await?;
    Ok(Json(IssueResponse {
        voucher: voucher_to_response(&voucher),
        barcode_checksum: barcode::code128_checksum(&payload),
        payload,
    }))
}

/// Redeem a voucher
pub async fn use_voucher(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(serial_no): Path<String>,
    Json(req): Json<UseVoucherRequest>,
) -> ApiResult<Json<VoucherResponse>> {
    let actor = actor_from(&headers);
    let voucher = state
        .ops
        .register_use(UseRequest {
            serial_no,
            site_code: req.site_code,
            amount: req.amount,
            used_at: None,
            note: req.notes,
            actor,
        })
        .await?;
    Ok(Json(voucher_to_response(&voucher)))
}

/// Recall an issued voucher
pub async fn recall_voucher(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(serial_no): Path<String>,
    Json(req): Json<RecallRequest>,
) -> ApiResult<Json<VoucherResponse>> {
    let actor = actor_from(&headers);
    let reason = req.reason.as_deref().unwrap_or("");
    let voucher = state.ops.recall(&serial_no, reason, &actor).await?;
    Ok(Json(voucher_to_response(&voucher)))
}

/// Administratively dispose a voucher (admin-only)
pub async fn dispose_voucher(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(serial_no): Path<String>,
    Json(req): Json<DisposeRequest>,
) -> ApiResult<Json<VoucherResponse>> {
    require_admin(&headers)?;
    let actor = actor_from(&headers);
    let voucher = state
        .ops
        .dispose(&serial_no, req.reason.as_deref(), &actor)
        .await?;
    Ok(Json(voucher_to_response(&voucher)))
}

/// Verify a scanned payload: authenticity plus a status report
pub async fn verify_payload(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<VerifyResponse>> {
    let scan = state.ops.verify_scan(&req.payload).await?;
    Ok(Json(VerifyResponse {
        valid: true,
        redeemable: scan.redeemable,
        serial_no: scan.voucher.serial_no.clone(),
        status: scan.voucher.status.as_str().to_string(),
    }))
}

/// Attach a per-voucher mobile access link
pub async fn issue_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(serial_no): Path<String>,
    Json(req): Json<LinkRequest>,
) -> ApiResult<Json<LinkResponse>> {
    let actor = actor_from(&headers);
    let (voucher, url) = state
        .ops
        .issue_voucher_link(&serial_no, req.expires_in_hours, &actor)
        .await?;
    let expires_at = voucher
        .link_expires_at
        .ok_or_else(|| exvo_core::VoucherError::Storage("link expiry missing".to_string()))?;
    Ok(Json(LinkResponse {
        serial_no: voucher.serial_no,
        url,
        expires_at,
    }))
}
