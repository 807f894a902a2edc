//! Voucher entity and lifecycle state machine
//!
//! A voucher moves `registered -> issued -> used`, with `issued -> recalled`
//! and `registered|issued -> disposed` as administrative exits. `used`,
//! `recalled` and `disposed` are terminal. Every status change is applied as
//! a single conditional update at the store (see [`crate::store`]), so the
//! types here only describe states and the data each transition records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{VoucherError, VoucherResult};
use crate::types::batch::BatchId;

/// Opaque system-assigned voucher identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoucherId(pub Uuid);

impl VoucherId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VoucherId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VoucherId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Voucher lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    /// Registered but not yet handed out
    Registered,
    /// Issued and redeemable
    Issued,
    /// Redeemed; terminal
    Used,
    /// Withdrawn after issuance; terminal
    Recalled,
    /// Administratively discarded; terminal
    Disposed,
}

impl VoucherStatus {
    /// Terminal states never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Used | Self::Recalled | Self::Disposed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Issued => "issued",
            Self::Used => "used",
            Self::Recalled => "recalled",
            Self::Disposed => "disposed",
        }
    }

    /// Operator-facing phrase for why this status blocks a transition
    pub fn blocking_reason(&self) -> &'static str {
        match self {
            Self::Registered => "not yet issued",
            Self::Issued => "already issued",
            Self::Used => "already used",
            Self::Recalled => "already recalled",
            Self::Disposed => "already disposed",
        }
    }
}

impl std::fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Issued,
    Reissued,
    Used,
    Recalled,
    Disposed,
}

/// Tagged lifecycle event
///
/// The event log keeps "used at" and "recalled at" as distinct records
/// instead of overloading one timestamp column; `Voucher::used_at` is set if
/// and only if the voucher is `used`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub at: DateTime<Utc>,
    pub actor: String,
    pub site: Option<String>,
    pub note: Option<String>,
}

impl LifecycleEvent {
    pub fn new(kind: EventKind, actor: impl Into<String>) -> Self {
        Self {
            kind,
            at: Utc::now(),
            actor: actor.into(),
            site: None,
            note: None,
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Input fields for creating a voucher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherDetails {
    /// Explicit serial number; generated when absent
    pub serial_no: Option<String>,
    /// Face value in currency minor units
    pub amount: u64,
    /// Issuing association
    pub association: String,
    pub member_id: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl VoucherDetails {
    /// Field-level validation applied before any mutation
    pub fn validate(&self) -> VoucherResult<()> {
        if self.amount == 0 {
            return Err(VoucherError::Validation(
                "amount must be a positive integer".to_string(),
            ));
        }
        for (field, value) in [
            ("association", &self.association),
            ("member_id", &self.member_id),
            ("name", &self.name),
        ] {
            if value.trim().is_empty() {
                return Err(VoucherError::Validation(format!(
                    "{field} must not be empty"
                )));
            }
        }
        if let Some(serial) = &self.serial_no {
            if serial.trim().is_empty() {
                return Err(VoucherError::Validation(
                    "serial_no must not be empty when supplied".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// The central entity: a value certificate bound to a recipient, an amount
/// and an issuing association
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    /// Human-facing identifier; globally unique, immutable once set
    pub serial_no: String,
    pub amount: u64,
    pub association: String,
    pub member_id: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub phone: Option<String>,

    pub status: VoucherStatus,
    pub issued_at: Option<DateTime<Utc>>,
    /// Set if and only if `status == Used`
    pub used_at: Option<DateTime<Utc>>,
    pub used_at_site: Option<String>,
    /// Free text, append-only by convention
    pub notes: String,

    /// Per-voucher mobile access link
    pub mobile_link_token: Option<String>,
    pub link_expires_at: Option<DateTime<Utc>>,

    /// At most one pickup batch per voucher
    pub batch_id: Option<BatchId>,

    /// Tagged lifecycle event log
    pub events: Vec<LifecycleEvent>,

    pub created_at: DateTime<Utc>,
}

impl Voucher {
    /// Create a registered voucher from validated details
    pub fn new(serial_no: String, details: &VoucherDetails) -> Self {
        Self {
            id: VoucherId::new(),
            serial_no,
            amount: details.amount,
            association: details.association.clone(),
            member_id: details.member_id.clone(),
            name: details.name.clone(),
            date_of_birth: details.date_of_birth,
            phone: details.phone.clone(),
            status: VoucherStatus::Registered,
            issued_at: None,
            used_at: None,
            used_at_site: None,
            notes: details.notes.clone().unwrap_or_default(),
            mobile_link_token: None,
            link_expires_at: None,
            batch_id: None,
            events: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create a voucher directly at `Issued` (bulk issue and pickup batches
    /// hand vouchers out without a separate registration step)
    pub fn new_issued(serial_no: String, details: &VoucherDetails, actor: &str) -> Self {
        let mut voucher = Self::new(serial_no, details);
        let now = Utc::now();
        voucher.status = VoucherStatus::Issued;
        voucher.issued_at = Some(now);
        voucher.events.push(LifecycleEvent {
            kind: EventKind::Issued,
            at: now,
            actor: actor.to_string(),
            site: None,
            note: None,
        });
        voucher
    }

    /// Append to the free-text notes, newline separated
    pub fn append_note(&mut self, note: &str) {
        if self.notes.is_empty() {
            self.notes = note.to_string();
        } else {
            self.notes.push('\n');
            self.notes.push_str(note);
        }
    }
}
