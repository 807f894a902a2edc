//! API Error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use exvo_core::VoucherError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Voucher(#[from] VoucherError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => {
                error_response(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", &msg, None)
            }
            ApiError::Voucher(e) => {
                let status = match &e {
                    VoucherError::Validation(_)
                    | VoucherError::InvalidFile { .. }
                    | VoucherError::InvalidSignature => StatusCode::BAD_REQUEST,
                    VoucherError::NotFound(_) => StatusCode::NOT_FOUND,
                    VoucherError::InvalidStateTransition { .. }
                    | VoucherError::DuplicateSerial(_)
                    | VoucherError::IssuedDateMismatch => StatusCode::CONFLICT,
                    VoucherError::LinkExpired => StatusCode::GONE,
                    VoucherError::GenerationExhausted { .. } | VoucherError::Storage(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                let errors = match &e {
                    VoucherError::InvalidFile { errors } => Some(errors.clone()),
                    _ => None,
                };
                error_response(status, e.code(), &e.to_string(), errors)
            }
        }
    }
}

fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    errors: Option<Vec<String>>,
) -> Response {
    let mut body = serde_json::json!({
        "error": message,
        "code": code,
    });
    if let Some(errors) = errors {
        body["errors"] = serde_json::json!(errors);
    }
    (status, Json(body)).into_response()
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;
