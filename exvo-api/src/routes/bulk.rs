//! Bulk operation endpoints
//!
//! Every bulk response carries per-row results plus aggregate counts, and
//! the HTTP status reflects the three-way outcome: all rows succeeded (200),
//! some succeeded (207 Multi-Status), none succeeded (409 when the failures
//! are state conflicts or duplicates, else 400).

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use exvo_core::{BulkOutcome, BulkRecallItem, BulkReport, BulkUseItem};

use crate::dto::{BulkIssueRequest, BulkRecallRequest, BulkResponse, BulkUseRequest};
use crate::error::ApiResult;
use crate::routes::{actor_from, require_admin};
use crate::state::AppState;

/// Promote registered vouchers to issued
pub async fn bulk_issue(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BulkIssueRequest>,
) -> ApiResult<Response> {
    let actor = actor_from(&headers);
    let serials = req.items.into_iter().map(|i| i.serial_no).collect();
    let report = state.ops.bulk_issue(serials, &actor).await;
    Ok(bulk_response(report))
}

/// Create new issued vouchers from a delimited-text upload
pub async fn bulk_issue_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let actor = actor_from(&headers);
    let report = state.ops.bulk_issue_csv(&body, &actor).await?;
    Ok(bulk_response(report))
}

/// Redeem many vouchers
pub async fn bulk_use(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BulkUseRequest>,
) -> ApiResult<Response> {
    let actor = actor_from(&headers);
    let items = req
        .items
        .into_iter()
        .map(|i| BulkUseItem {
            serial_no: i.serial_no,
            site_code: i.site_code,
            amount: i.amount,
            used_date: None,
            notes: i.notes,
        })
        .collect();
    let report = state.ops.bulk_register_use(items, &actor).await;
    Ok(bulk_response(report))
}

/// Redeem many vouchers from a delimited-text upload
pub async fn bulk_use_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let actor = actor_from(&headers);
    let report = state.ops.bulk_register_use_csv(&body, &actor).await?;
    Ok(bulk_response(report))
}

/// Recall many issued vouchers (admin-only)
pub async fn bulk_recall(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BulkRecallRequest>,
) -> ApiResult<Response> {
    require_admin(&headers)?;
    let actor = actor_from(&headers);
    let items = req
        .items
        .into_iter()
        .map(|i| BulkRecallItem {
            serial_no: i.serial_no,
            reason: i.reason,
        })
        .collect();
    let report = state.ops.bulk_recall(items, &actor).await;
    Ok(bulk_response(report))
}

/// Map the three-way bulk outcome onto an HTTP status
fn bulk_response(report: BulkReport) -> Response {
    let status = match report.outcome() {
        BulkOutcome::AllSucceeded => StatusCode::OK,
        BulkOutcome::Partial => StatusCode::MULTI_STATUS,
        BulkOutcome::AllFailed => {
            let conflict = report.results.iter().any(|r| {
                matches!(
                    r.code.as_deref(),
                    Some("INVALID_STATE_TRANSITION") | Some("DUPLICATE_SERIAL")
                )
            });
            if conflict {
                StatusCode::CONFLICT
            } else {
                StatusCode::BAD_REQUEST
            }
        }
    };
    (status, Json(BulkResponse::from(report))).into_response()
}
