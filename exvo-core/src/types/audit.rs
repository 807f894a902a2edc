//! Audit entry: append-only record of every state-changing action
//!
//! The core emits these through [`crate::store::AuditSink`] but does not own
//! their storage; a sink failure never rolls back the mutation it describes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Operation name (`register`, `issue`, `use`, `recall`, ...)
    pub action: String,
    pub actor: String,
    pub serial_no: Option<String>,
    pub details: String,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            actor: actor.into(),
            serial_no: None,
            details: String::new(),
            at: Utc::now(),
        }
    }

    pub fn with_serial(mut self, serial_no: impl Into<String>) -> Self {
        self.serial_no = Some(serial_no.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}
