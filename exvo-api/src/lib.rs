//! # exvo-api
//!
//! HTTP layer for the exchange voucher service: DTOs, route handlers,
//! error-to-status mapping (including the 200/207 multi-status bulk
//! outcome) and server setup.

pub mod dto;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use server::{create_server, run_server};
pub use state::{ApiConfig, AppState};
