//! Application state for the API server

use std::sync::Arc;

use exvo_core::store::{AuditSink, NotifySink};
use exvo_core::{OpsConfig, VoucherOps};
use exvo_store::{MemoryAuditSink, MemoryStore, TracingNotifier};

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Voucher operations
    pub ops: Arc<VoucherOps<MemoryStore>>,
    /// API version
    pub version: String,
}

impl AppState {
    /// Create app state with the in-memory backend and default sinks
    pub fn new(config: &ApiConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let audit: Arc<dyn AuditSink> = Arc::new(MemoryAuditSink::new());
        let notify: Arc<dyn NotifySink> = Arc::new(TracingNotifier::new());
        let ops = VoucherOps::new(store, audit, notify, config.ops_config());
        Self {
            ops: Arc::new(ops),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Create app state around pre-built operations (tests)
    pub fn with_ops(ops: Arc<VoucherOps<MemoryStore>>) -> Self {
        Self {
            ops,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    /// Base URL used in generated mobile access links
    pub base_url: String,
    /// HMAC secret for the scan-payload codec
    pub payload_secret: String,
    /// Default validity for access links
    pub default_link_hours: u32,
}

impl ApiConfig {
    pub fn ops_config(&self) -> OpsConfig {
        OpsConfig {
            payload_secret: self.payload_secret.clone().into_bytes(),
            base_url: self.base_url.clone(),
            serial_attempts: 100,
            default_link_hours: self.default_link_hours,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
            base_url: "http://localhost:3000".to_string(),
            payload_secret: "insecure-dev-secret".to_string(),
            default_link_hours: 72,
        }
    }
}
