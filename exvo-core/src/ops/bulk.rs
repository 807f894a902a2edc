//! Bulk orchestration
//!
//! Three shapes, one pattern: bulk issue (promote existing vouchers or
//! create new ones from a file), bulk recall, bulk register-use. Rows are
//! processed sequentially in input order; a failing row is recorded and
//! skipped, never aborting the batch. Malformed *files* are the exception:
//! structural or field validation failures reject the whole upload before
//! any mutation, because a bad file signals a bad export rather than an
//! expected business conflict.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{UseRequest, VoucherOps};
use crate::csv;
use crate::error::{VoucherError, VoucherResult};
use crate::store::{BatchStore, VoucherStore};
use crate::types::batch::BatchId;
use crate::types::voucher::{Voucher, VoucherDetails};

/// Per-row outcome, reported in input order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowResult {
    /// Serial number when known, otherwise the row position
    pub reference: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

/// Aggregate counts; `total == success + error` always
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BulkSummary {
    pub total: u32,
    pub success: u32,
    pub error: u32,
}

/// Three-way observable outcome of a bulk operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    AllSucceeded,
    Partial,
    AllFailed,
}

/// Ordered per-row results plus aggregate counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkReport {
    pub summary: BulkSummary,
    pub results: Vec<RowResult>,
}

impl BulkReport {
    pub fn from_results(results: Vec<RowResult>) -> Self {
        let success = results.iter().filter(|r| r.success).count() as u32;
        let error = results.len() as u32 - success;
        Self {
            summary: BulkSummary {
                total: results.len() as u32,
                success,
                error,
            },
            results,
        }
    }

    pub fn outcome(&self) -> BulkOutcome {
        if self.summary.error == 0 {
            BulkOutcome::AllSucceeded
        } else if self.summary.success == 0 {
            BulkOutcome::AllFailed
        } else {
            BulkOutcome::Partial
        }
    }
}

/// One bulk register-use item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUseItem {
    pub serial_no: String,
    pub site_code: String,
    pub amount: Option<u64>,
    pub used_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// One bulk recall item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRecallItem {
    pub serial_no: String,
    pub reason: Option<String>,
}

fn ok_row(reference: impl Into<String>, message: impl Into<String>) -> RowResult {
    RowResult {
        reference: reference.into(),
        success: true,
        code: None,
        message: message.into(),
    }
}

fn err_row(reference: impl Into<String>, error: &VoucherError) -> RowResult {
    RowResult {
        reference: reference.into(),
        success: false,
        code: Some(error.code().to_string()),
        message: error.to_string(),
    }
}

impl<S: VoucherStore + BatchStore> VoucherOps<S> {
    /// Promote existing vouchers `registered -> issued`, one row at a time
    pub async fn bulk_issue(&self, serials: Vec<String>, actor: &str) -> BulkReport {
        let mut results = Vec::with_capacity(serials.len());
        for serial_no in serials {
            results.push(match self.issue(&serial_no, actor).await {
                Ok((voucher, _payload)) => ok_row(voucher.serial_no, "issued"),
                Err(e) => err_row(serial_no, &e),
            });
        }
        let report = BulkReport::from_results(results);
        tracing::info!(
            operation = "bulk_issue",
            count = report.summary.total,
            error = report.summary.error,
            "Bulk issue finished"
        );
        report
    }

    /// Create new vouchers directly at `issued`
    pub async fn bulk_create_issue(&self, rows: Vec<VoucherDetails>, actor: &str) -> BulkReport {
        let mut accepted: HashSet<String> = HashSet::new();
        let mut results = Vec::with_capacity(rows.len());
        for (i, details) in rows.iter().enumerate() {
            let reference = details
                .serial_no
                .clone()
                .unwrap_or_else(|| format!("row {}", i + 1));
            results.push(
                match self
                    .create_issued_row(details, &mut accepted, None, actor)
                    .await
                {
                    Ok(voucher) => ok_row(voucher.serial_no, "issued"),
                    Err(e) => err_row(reference, &e),
                },
            );
        }
        let report = BulkReport::from_results(results);
        tracing::info!(
            operation = "bulk_create_issue",
            count = report.summary.total,
            error = report.summary.error,
            "Bulk creation finished"
        );
        report
    }

    /// Parse and run a bulk-issue file upload; a malformed file rejects the
    /// whole request before any row is processed
    pub async fn bulk_issue_csv(&self, bytes: &[u8], actor: &str) -> VoucherResult<BulkReport> {
        let rows = parse_issue_csv(bytes)?;
        Ok(self.bulk_create_issue(rows, actor).await)
    }

    /// Redeem many vouchers (`issued -> used`), one row at a time
    pub async fn bulk_register_use(&self, items: Vec<BulkUseItem>, actor: &str) -> BulkReport {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let request = UseRequest {
                serial_no: item.serial_no.clone(),
                site_code: item.site_code,
                amount: item.amount,
                used_at: item
                    .used_date
                    .map(|d| d.and_time(NaiveTime::MIN).and_utc()),
                note: item.notes,
                actor: actor.to_string(),
            };
            results.push(match self.register_use(request).await {
                Ok(voucher) => ok_row(voucher.serial_no, "used"),
                Err(e) => err_row(item.serial_no, &e),
            });
        }
        let report = BulkReport::from_results(results);
        tracing::info!(
            operation = "bulk_use",
            count = report.summary.total,
            error = report.summary.error,
            "Bulk redemption finished"
        );
        report
    }

    /// Parse and run a bulk register-use file upload
    pub async fn bulk_register_use_csv(
        &self,
        bytes: &[u8],
        actor: &str,
    ) -> VoucherResult<BulkReport> {
        let items = parse_use_csv(bytes)?;
        Ok(self.bulk_register_use(items, actor).await)
    }

    /// Recall many issued vouchers; callers gate this behind an admin check
    pub async fn bulk_recall(&self, items: Vec<BulkRecallItem>, actor: &str) -> BulkReport {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let reason = item.reason.as_deref().unwrap_or("bulk recall");
            results.push(match self.recall(&item.serial_no, reason, actor).await {
                Ok(voucher) => ok_row(voucher.serial_no, "recalled"),
                Err(e) => err_row(item.serial_no, &e),
            });
        }
        let report = BulkReport::from_results(results);
        tracing::info!(
            operation = "bulk_recall",
            count = report.summary.total,
            error = report.summary.error,
            "Bulk recall finished"
        );
        report
    }

    /// Create one voucher at `issued`, checking the serial against both the
    /// store and serials already accepted in this request
    pub(crate) async fn create_issued_row(
        &self,
        details: &VoucherDetails,
        accepted: &mut HashSet<String>,
        batch_id: Option<BatchId>,
        actor: &str,
    ) -> VoucherResult<Voucher> {
        details.validate()?;
        let serial_no = match &details.serial_no {
            Some(serial) => {
                let serial = serial.trim().to_string();
                if accepted.contains(&serial) || self.store().serial_exists(&serial).await? {
                    return Err(VoucherError::DuplicateSerial(serial));
                }
                serial
            }
            None => self.unique_serial(accepted).await?,
        };

        let mut voucher = Voucher::new_issued(serial_no.clone(), details, actor);
        voucher.batch_id = batch_id;
        let mut inserted = self.store().insert(vec![voucher]).await?;
        let voucher = inserted
            .pop()
            .ok_or_else(|| VoucherError::Storage("insert returned no rows".to_string()))?;
        accepted.insert(serial_no);

        self.record_audit(
            "issue",
            actor,
            Some(&voucher.serial_no),
            format!("amount {} for {}", voucher.amount, voucher.association),
        )
        .await;
        Ok(voucher)
    }
}

/// Required columns for a bulk-issue upload
const ISSUE_COLUMNS: [&str; 5] = ["amount", "association", "member_id", "name", "dob"];

/// Required columns for a bulk register-use upload
const USE_COLUMNS: [&str; 3] = ["serial_no", "used_date", "site_code"];

/// Parse a bulk-issue upload into voucher details.
///
/// Any failing row rejects the whole file with row-numbered messages.
pub fn parse_issue_csv(bytes: &[u8]) -> VoucherResult<Vec<VoucherDetails>> {
    let doc = csv::parse_upload(bytes)?;
    let index = csv::require_columns(&doc, &ISSUE_COLUMNS)?;

    let mut errors = Vec::new();
    let mut rows = Vec::with_capacity(doc.rows.len());
    for record in &doc.rows {
        let n = record.row_no;
        let mut row_errors = Vec::new();

        let amount = match record.field(index["amount"]) {
            "" => {
                row_errors.push(format!("row {n}: column amount is required"));
                0
            }
            raw => match raw.parse::<u64>() {
                Ok(0) | Err(_) => {
                    row_errors.push(format!(
                        "row {n}: column amount must be a positive integer (got '{raw}')"
                    ));
                    0
                }
                Ok(v) => v,
            },
        };

        let dob = match record.field(index["dob"]) {
            "" => {
                row_errors.push(format!("row {n}: column dob is required"));
                None
            }
            raw => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(d) => Some(d),
                Err(_) => {
                    row_errors.push(format!(
                        "row {n}: column dob must match YYYY-MM-DD (got '{raw}')"
                    ));
                    None
                }
            },
        };

        for column in ["association", "member_id", "name"] {
            if record.field(index[column]).is_empty() {
                row_errors.push(format!("row {n}: column {column} is required"));
            }
        }

        if row_errors.is_empty() {
            // dob is Some here: an empty or malformed value was a row error
            let Some(date_of_birth) = dob else { continue };
            rows.push(VoucherDetails {
                serial_no: optional_field(record, &index, "serial_no"),
                amount,
                association: record.field(index["association"]).to_string(),
                member_id: record.field(index["member_id"]).to_string(),
                name: record.field(index["name"]).to_string(),
                date_of_birth,
                phone: optional_field(record, &index, "phone"),
                notes: optional_field(record, &index, "notes"),
            });
        } else {
            errors.extend(row_errors);
        }
    }

    if !errors.is_empty() {
        return Err(VoucherError::InvalidFile { errors });
    }
    Ok(rows)
}

/// Parse a bulk register-use upload
pub fn parse_use_csv(bytes: &[u8]) -> VoucherResult<Vec<BulkUseItem>> {
    let doc = csv::parse_upload(bytes)?;
    let index = csv::require_columns(&doc, &USE_COLUMNS)?;

    let mut errors = Vec::new();
    let mut items = Vec::with_capacity(doc.rows.len());
    for record in &doc.rows {
        let n = record.row_no;
        let mut row_errors = Vec::new();

        let serial_no = record.field(index["serial_no"]).to_string();
        if serial_no.is_empty() {
            row_errors.push(format!("row {n}: column serial_no is required"));
        }

        let site_code = record.field(index["site_code"]).to_string();
        if site_code.is_empty() {
            row_errors.push(format!("row {n}: column site_code is required"));
        }

        let used_date = match record.field(index["used_date"]) {
            "" => {
                row_errors.push(format!("row {n}: column used_date is required"));
                None
            }
            raw => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(d) => Some(d),
                Err(_) => {
                    row_errors.push(format!(
                        "row {n}: column used_date must match YYYY-MM-DD (got '{raw}')"
                    ));
                    None
                }
            },
        };

        if row_errors.is_empty() {
            items.push(BulkUseItem {
                serial_no,
                site_code,
                amount: None,
                used_date,
                notes: optional_field(record, &index, "notes"),
            });
        } else {
            errors.extend(row_errors);
        }
    }

    if !errors.is_empty() {
        return Err(VoucherError::InvalidFile { errors });
    }
    Ok(items)
}

fn optional_field(
    record: &csv::CsvRecord,
    index: &std::collections::HashMap<String, usize>,
    column: &str,
) -> Option<String> {
    index
        .get(column)
        .map(|i| record.field(*i))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUE_HEADER: &str = "serial_no,amount,association,member_id,name,dob,phone,notes";

    #[test]
    fn test_report_math() {
        let report = BulkReport::from_results(vec![
            ok_row("a", "issued"),
            err_row("b", &VoucherError::NotFound("b".to_string())),
            ok_row("c", "issued"),
        ]);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.success, 2);
        assert_eq!(report.summary.error, 1);
        assert_eq!(
            report.summary.total,
            report.summary.success + report.summary.error
        );
        assert_eq!(report.outcome(), BulkOutcome::Partial);
    }

    #[test]
    fn test_report_outcomes() {
        let all_ok = BulkReport::from_results(vec![ok_row("a", "ok")]);
        assert_eq!(all_ok.outcome(), BulkOutcome::AllSucceeded);

        let all_err = BulkReport::from_results(vec![err_row(
            "a",
            &VoucherError::NotFound("a".to_string()),
        )]);
        assert_eq!(all_err.outcome(), BulkOutcome::AllFailed);
    }

    #[test]
    fn test_parse_issue_csv_happy_path() {
        let body = format!(
            "{ISSUE_HEADER}\n\
             ,10000,Northside,M-001,\"Kim, Su\",1954-03-01,010-1234-5678,\n\
             25080699999,5000,Northside,M-002,Lee Ha,1960-12-24,,priority\n"
        );
        let rows = parse_issue_csv(body.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Kim, Su");
        assert_eq!(rows[0].amount, 10_000);
        assert!(rows[0].serial_no.is_none());
        assert_eq!(rows[1].serial_no.as_deref(), Some("25080699999"));
        assert_eq!(rows[1].notes.as_deref(), Some("priority"));
    }

    #[test]
    fn test_missing_amount_rejects_whole_file() {
        let body = format!(
            "{ISSUE_HEADER}\n\
             ,10000,Northside,M-001,Kim Su,1954-03-01,,\n\
             ,20000,Northside,M-002,Lee Ha,1960-12-24,,\n\
             ,30000,Northside,M-003,Park Jin,1950-07-07,,\n\
             ,,Northside,M-004,Choi Min,1948-01-15,,\n"
        );
        let err = parse_issue_csv(body.as_bytes()).unwrap_err();
        match err {
            VoucherError::InvalidFile { errors } => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("row 4"));
                assert!(errors[0].contains("amount"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_amount_and_date_both_reported() {
        let body = format!(
            "{ISSUE_HEADER}\n\
             ,\"10,000\",Northside,M-001,Kim Su,1954-03-01,,\n\
             ,5000,Northside,M-002,Lee Ha,24-12-1960,,\n"
        );
        let err = parse_issue_csv(body.as_bytes()).unwrap_err();
        match err {
            VoucherError::InvalidFile { errors } => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].contains("row 1"));
                assert!(errors[0].contains("10,000"));
                assert!(errors[1].contains("row 2"));
                assert!(errors[1].contains("dob"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_column_fails_before_rows() {
        let body = "amount,name\n10000,Kim Su\n";
        let err = parse_issue_csv(body.as_bytes()).unwrap_err();
        match err {
            VoucherError::InvalidFile { errors } => {
                assert!(errors.iter().any(|e| e.contains("association")));
                assert!(errors.iter().any(|e| e.contains("member_id")));
                assert!(errors.iter().any(|e| e.contains("dob")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_use_csv() {
        let body = "serial_no,used_date,site_code,notes\n\
                    25080612345,2025-08-06,S-01,\n\
                    25080667890,2025-08-06,S-02,walk-in\n";
        let items = parse_use_csv(body.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].serial_no, "25080612345");
        assert_eq!(items[1].notes.as_deref(), Some("walk-in"));
    }

    #[test]
    fn test_parse_use_csv_semicolon_delimiter() {
        let body = "serial_no;used_date;site_code\n25080612345;2025-08-06;S-01\n";
        let items = parse_use_csv(body.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].site_code, "S-01");
    }
}
