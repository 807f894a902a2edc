//! Pickup batch endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::dto::{
    batch_to_response, voucher_to_response, BatchAccessResponse, BatchCreatedResponse,
    CreateBatchRequest,
};
use crate::error::ApiResult;
use crate::routes::actor_from;
use crate::state::AppState;

/// Create a pickup batch of freshly issued vouchers behind one shared token
pub async fn create_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBatchRequest>,
) -> ApiResult<(StatusCode, Json<BatchCreatedResponse>)> {
    let actor = actor_from(&headers);
    let items = req.items.into_iter().map(Into::into).collect();
    let created = state
        .ops
        .create_pickup_batch(&req.batch_name, items, req.expires_in_hours, &actor)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BatchCreatedResponse {
            batch: batch_to_response(&created.batch),
            url: created.url,
            summary: created.report.summary,
            results: created.report.results,
        }),
    ))
}

/// Resolve a bearer token to its batch and vouchers; the first access past
/// expiry flips the batch to expired and is denied
pub async fn access_batch(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<BatchAccessResponse>> {
    let access = state.ops.access_batch(&token).await?;
    Ok(Json(BatchAccessResponse {
        batch: batch_to_response(&access.batch),
        vouchers: access.vouchers.iter().map(voucher_to_response).collect(),
    }))
}
