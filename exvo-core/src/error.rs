//! Error types for the voucher core
//!
//! One taxonomy for the whole crate; bulk operations capture these per row,
//! single-item operations propagate them to the caller for status mapping.

use thiserror::Error;

use crate::types::voucher::VoucherStatus;

/// Voucher core errors
#[derive(Error, Debug)]
pub enum VoucherError {
    /// Malformed input; rejected before any mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// A delimited upload failed structural or field validation; the whole
    /// file is rejected and nothing is inserted
    #[error("File rejected: {}", errors.join("; "))]
    InvalidFile { errors: Vec<String> },

    #[error("Not found: {0}")]
    NotFound(String),

    /// The voucher's current status forbids the requested transition.
    /// Carries the actual status so callers can render a precise message.
    #[error("Cannot {attempted} voucher {serial_no}: {}", current.blocking_reason())]
    InvalidStateTransition {
        serial_no: String,
        current: VoucherStatus,
        attempted: &'static str,
    },

    #[error("Serial number already exists: {0}")]
    DuplicateSerial(String),

    /// Scan payload failed the cryptographic check; distinct from NotFound so
    /// operators can tell forged codes from stale data
    #[error("Payload signature verification failed")]
    InvalidSignature,

    /// Scan payload carries an issuance timestamp that no longer matches the
    /// voucher; the code predates a reissue
    #[error("Payload issuance timestamp does not match the current issuance")]
    IssuedDateMismatch,

    /// Serial generator could not find a free value within the retry budget
    #[error("Serial generation exhausted after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    /// Access link has passed its expiry
    #[error("Access link expired")]
    LinkExpired,

    /// Unexpected store fault
    #[error("Storage error: {0}")]
    Storage(String),
}

impl VoucherError {
    /// Stable machine-readable code for API bodies and bulk row results
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidFile { .. } => "INVALID_FILE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::DuplicateSerial(_) => "DUPLICATE_SERIAL",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::IssuedDateMismatch => "ISSUED_DATE_MISMATCH",
            Self::GenerationExhausted { .. } => "GENERATION_EXHAUSTED",
            Self::LinkExpired => "LINK_EXPIRED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// Result type alias for voucher core operations
pub type VoucherResult<T> = Result<T, VoucherError>;
