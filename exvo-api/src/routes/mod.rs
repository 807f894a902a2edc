//! API route handlers

pub mod bulk;
pub mod health;
pub mod pickup;
pub mod voucher;

use axum::http::HeaderMap;
use axum::{routing::get, routing::post, Router};

use crate::error::ApiError;
use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        // Voucher endpoints
        .route("/vouchers", post(voucher::register_voucher))
        .route("/vouchers/verify", post(voucher::verify_payload))
        .route(
            "/vouchers/:serial_no",
            get(voucher::get_voucher).delete(voucher::delete_voucher),
        )
        .route("/vouchers/:serial_no/issue", post(voucher::issue_voucher))
        .route("/vouchers/:serial_no/reissue", post(voucher::reissue_voucher))
        .route("/vouchers/:serial_no/use", post(voucher::use_voucher))
        .route("/vouchers/:serial_no/recall", post(voucher::recall_voucher))
        .route("/vouchers/:serial_no/dispose", post(voucher::dispose_voucher))
        .route("/vouchers/:serial_no/link", post(voucher::issue_link))
        // Bulk endpoints
        .route("/bulk/issue", post(bulk::bulk_issue))
        .route("/bulk/issue/csv", post(bulk::bulk_issue_csv))
        .route("/bulk/use", post(bulk::bulk_use))
        .route("/bulk/use/csv", post(bulk::bulk_use_csv))
        .route("/bulk/recall", post(bulk::bulk_recall))
        // Pickup batch endpoints
        .route("/batches", post(pickup::create_batch))
        .route("/batches/by-token/:token", get(pickup::access_batch))
        // State
        .with_state(state)
}

/// Acting user from the `x-actor-id` header
pub(crate) fn actor_from(headers: &HeaderMap) -> String {
    headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Minimum role check for administrative operations: `x-actor-role: admin`
pub(crate) fn require_admin(headers: &HeaderMap) -> Result<(), ApiError> {
    let role = headers
        .get("x-actor-role")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if role.eq_ignore_ascii_case("admin") {
        Ok(())
    } else {
        Err(ApiError::Unauthorized(
            "admin role required".to_string(),
        ))
    }
}
