//! Delimited-text upload ingestion
//!
//! Uploads arrive from heterogeneous office software, so nothing about the
//! bytes is trusted: the decoder tries several text encodings and scores
//! each candidate by density of valid-looking characters, a leading BOM is
//! stripped, and the field delimiter is auto-detected from the header line.
//! Quoted fields use doubled-quote escaping and may span lines.
//!
//! Structural problems reject the whole file (`InvalidFile`); business-rule
//! conflicts are not this module's concern.

use std::collections::HashMap;

use encoding_rs::{Encoding, EUC_KR, UTF_8, WINDOWS_1252};

use crate::error::{VoucherError, VoucherResult};

/// Delimiters considered during auto-detection
const DELIMITERS: [char; 3] = [',', '\t', ';'];

/// A parsed upload: header row plus data records
#[derive(Debug, Clone)]
pub struct CsvDocument {
    pub delimiter: char,
    pub headers: Vec<String>,
    pub rows: Vec<CsvRecord>,
}

/// One data record; `row_no` is 1-based among data rows (the header is not
/// counted)
#[derive(Debug, Clone)]
pub struct CsvRecord {
    pub row_no: usize,
    pub fields: Vec<String>,
}

impl CsvRecord {
    /// Field by header index, trimmed; empty string when the row is short
    pub fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).map(|f| f.trim()).unwrap_or("")
    }
}

/// Decode, strip BOM, detect delimiter and parse an uploaded file
pub fn parse_upload(bytes: &[u8]) -> VoucherResult<CsvDocument> {
    let text = decode_upload(bytes);
    parse_text(strip_bom(&text))
}

/// Decode bytes by scoring candidate encodings and keeping the best
pub fn decode_upload(bytes: &[u8]) -> String {
    const CANDIDATES: [&Encoding; 3] = [UTF_8, EUC_KR, WINDOWS_1252];

    let mut best: Option<(f64, String)> = None;
    for encoding in CANDIDATES {
        let (decoded, _, _) = encoding.decode(bytes);
        let score = text_score(&decoded);
        match &best {
            Some((best_score, _)) if *best_score >= score => {}
            _ => best = Some((score, decoded.into_owned())),
        }
    }
    best.map(|(_, text)| text).unwrap_or_default()
}

/// Density of valid-looking characters; replacement characters count hard
/// against a candidate
fn text_score(text: &str) -> f64 {
    let mut total = 0u32;
    let mut score = 0i64;
    for c in text.chars() {
        total += 1;
        if c == '\u{FFFD}' {
            score -= 2;
        } else if c.is_ascii_graphic()
            || c == ' '
            || c == '\t'
            || c == '\n'
            || c == '\r'
            || c.is_alphanumeric()
        {
            score += 1;
        } else if c.is_control() {
            score -= 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    score as f64 / f64::from(total)
}

/// Strip a leading byte-order mark
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{FEFF}').unwrap_or(text)
}

/// Pick the delimiter with the highest count in the header line
pub fn detect_delimiter(header_line: &str) -> char {
    let mut best = ',';
    let mut best_count = 0usize;
    for candidate in DELIMITERS {
        let count = header_line.matches(candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Parse decoded text into header and data records
pub fn parse_text(text: &str) -> VoucherResult<CsvDocument> {
    if text.trim().is_empty() {
        return Err(VoucherError::InvalidFile {
            errors: vec!["file is empty".to_string()],
        });
    }

    let header_line = text.lines().next().unwrap_or("");
    let delimiter = detect_delimiter(header_line);
    let mut records = split_records(text, delimiter)?;

    if records.is_empty() {
        return Err(VoucherError::InvalidFile {
            errors: vec!["file has no header row".to_string()],
        });
    }

    let headers: Vec<String> = records.remove(0).into_iter().map(|h| h.trim().to_string()).collect();
    let rows = records
        .into_iter()
        .enumerate()
        .map(|(i, fields)| CsvRecord {
            row_no: i + 1,
            fields,
        })
        .collect();

    Ok(CsvDocument {
        delimiter,
        headers,
        rows,
    })
}

/// Split text into records, honoring quoted fields with doubled-quote
/// escaping; quoted fields may contain delimiters and line breaks
fn split_records(text: &str, delimiter: char) -> VoucherResult<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' && field.trim().is_empty() {
            field.clear();
            in_quotes = true;
        } else if c == delimiter {
            record.push(std::mem::take(&mut field));
        } else if c == '\n' || c == '\r' {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            record.push(std::mem::take(&mut field));
            push_record(&mut records, std::mem::take(&mut record));
        } else {
            field.push(c);
        }
    }

    if in_quotes {
        return Err(VoucherError::InvalidFile {
            errors: vec!["unterminated quoted field".to_string()],
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }

    Ok(records)
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    // Drop blank lines
    if record.len() == 1 && record[0].trim().is_empty() {
        return;
    }
    records.push(record);
}

/// Validate that every required column is present; returns normalized header
/// name -> index. Fails fast listing all missing columns.
pub fn require_columns(
    doc: &CsvDocument,
    required: &[&str],
) -> VoucherResult<HashMap<String, usize>> {
    let mut index = HashMap::new();
    for (i, header) in doc.headers.iter().enumerate() {
        index.entry(header.trim().to_lowercase()).or_insert(i);
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|col| !index.contains_key(**col))
        .map(|col| format!("missing required column: {col}"))
        .collect();
    if !missing.is_empty() {
        return Err(VoucherError::InvalidFile { errors: missing });
    }

    Ok(index)
}
