//! Signed scan-payload codec
//!
//! The payload embedded in a voucher's QR/barcode lets a handheld scanner
//! prove authenticity without a live transaction lookup: the signature is an
//! HMAC over immutable identity fields plus a server-held secret, and the
//! embedded issuance timestamp ties the code to the voucher's *current*
//! issuance so reprints of a superseded code are rejected.
//!
//! Wire format: `VCH:<serial_no>|TS:<YYYYMMDDHHmm>|SIG:<hex-hmac>` with
//! fixed field order and literal tags.
//!
//! The codec decides authenticity only; redemption eligibility (status
//! `issued`) is a separate subsequent check against the store.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{VoucherError, VoucherResult};
use crate::types::voucher::Voucher;

type HmacSha256 = Hmac<Sha256>;

/// Timestamp layout embedded in the payload
pub const TS_FORMAT: &str = "%Y%m%d%H%M";

/// Parsed form of a scanned payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPayload {
    pub serial_no: String,
    /// Issuance timestamp exactly as embedded, `YYYYMMDDHHmm`
    pub issued_ts: String,
    pub signature_hex: String,
}

/// Signs and verifies scan payloads with a shared secret
#[derive(Clone)]
pub struct PayloadCodec {
    secret: Vec<u8>,
}

impl PayloadCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Produce the payload string for an issued voucher
    pub fn encode(&self, voucher: &Voucher) -> VoucherResult<String> {
        let issued_at = voucher.issued_at.ok_or_else(|| {
            VoucherError::Validation(format!(
                "voucher {} has no issuance timestamp to sign",
                voucher.serial_no
            ))
        })?;
        let ts = issued_at.format(TS_FORMAT).to_string();
        let sig = self.sign(voucher);
        Ok(format!("VCH:{}|TS:{}|SIG:{}", voucher.serial_no, ts, sig))
    }

    /// Parse a scanned payload without verifying it
    pub fn parse(payload: &str) -> VoucherResult<ScanPayload> {
        let mut parts = payload.split('|');
        let serial_no = tagged_field(parts.next(), "VCH:")?;
        let issued_ts = tagged_field(parts.next(), "TS:")?;
        let signature_hex = tagged_field(parts.next(), "SIG:")?;
        if parts.next().is_some() {
            return Err(VoucherError::Validation(
                "malformed payload: trailing fields".to_string(),
            ));
        }
        if serial_no.is_empty() {
            return Err(VoucherError::Validation(
                "malformed payload: empty serial".to_string(),
            ));
        }
        if issued_ts.len() != 12 || !issued_ts.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VoucherError::Validation(
                "malformed payload: timestamp must be 12 digits".to_string(),
            ));
        }
        Ok(ScanPayload {
            serial_no: serial_no.to_string(),
            issued_ts: issued_ts.to_string(),
            signature_hex: signature_hex.to_string(),
        })
    }

    /// Verify a scanned payload against the currently stored voucher.
    ///
    /// Checks, in order: signature (constant-time) then issuance freshness.
    /// The caller resolves "voucher not found" separately at lookup time.
    pub fn verify(&self, payload: &str, voucher: &Voucher) -> VoucherResult<ScanPayload> {
        let parsed = Self::parse(payload)?;
        if parsed.serial_no != voucher.serial_no {
            return Err(VoucherError::Validation(
                "payload serial does not match voucher".to_string(),
            ));
        }

        let sig_bytes =
            hex::decode(&parsed.signature_hex).map_err(|_| VoucherError::InvalidSignature)?;
        let mut mac = self.mac();
        mac.update(&canonical_message(voucher));
        mac.verify_slice(&sig_bytes)
            .map_err(|_| VoucherError::InvalidSignature)?;

        let issued_at = voucher.issued_at.ok_or(VoucherError::IssuedDateMismatch)?;
        if parsed.issued_ts != issued_at.format(TS_FORMAT).to_string() {
            return Err(VoucherError::IssuedDateMismatch);
        }

        Ok(parsed)
    }

    fn sign(&self, voucher: &Voucher) -> String {
        let mut mac = self.mac();
        mac.update(&canonical_message(voucher));
        hex::encode(mac.finalize().into_bytes())
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(&self.secret).expect("HMAC key of any length is accepted")
    }
}

/// Canonical concatenation of immutable identity fields; never the mutable
/// status
fn canonical_message(voucher: &Voucher) -> Vec<u8> {
    format!(
        "{}:{}:{}:{}",
        voucher.serial_no, voucher.amount, voucher.association, voucher.member_id
    )
    .into_bytes()
}

fn tagged_field<'a>(part: Option<&'a str>, tag: &str) -> VoucherResult<&'a str> {
    match part {
        Some(p) if p.starts_with(tag) => Ok(&p[tag.len()..]),
        _ => Err(VoucherError::Validation(format!(
            "malformed payload: expected {tag} field"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::voucher::{Voucher, VoucherDetails};
    use chrono::{Duration, NaiveDate, Utc};

    fn issued_voucher() -> Voucher {
        let details = VoucherDetails {
            serial_no: None,
            amount: 10_000,
            association: "Northside Association".to_string(),
            member_id: "M-001".to_string(),
            name: "Kim Su".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1954, 3, 1).unwrap(),
            phone: None,
            notes: None,
        };
        Voucher::new_issued("25080612345".to_string(), &details, "tester")
    }

    fn codec() -> PayloadCodec {
        PayloadCodec::new(b"test-secret".to_vec())
    }

    #[test]
    fn test_round_trip() {
        let voucher = issued_voucher();
        let payload = codec().encode(&voucher).unwrap();
        assert!(payload.starts_with("VCH:25080612345|TS:"));
        codec().verify(&payload, &voucher).unwrap();
    }

    #[test]
    fn test_tampered_amount_fails_signature() {
        let mut voucher = issued_voucher();
        let payload = codec().encode(&voucher).unwrap();
        voucher.amount = 50_000;
        let err = codec().verify(&payload, &voucher).unwrap_err();
        assert!(matches!(err, VoucherError::InvalidSignature));
    }

    #[test]
    fn test_wrong_secret_fails_signature() {
        let voucher = issued_voucher();
        let payload = codec().encode(&voucher).unwrap();
        let other = PayloadCodec::new(b"other-secret".to_vec());
        let err = other.verify(&payload, &voucher).unwrap_err();
        assert!(matches!(err, VoucherError::InvalidSignature));
    }

    #[test]
    fn test_stale_payload_after_reissue() {
        let mut voucher = issued_voucher();
        let payload = codec().encode(&voucher).unwrap();
        // Reissue: same identity, fresh issuance timestamp
        voucher.issued_at = Some(Utc::now() + Duration::minutes(5));
        let err = codec().verify(&payload, &voucher).unwrap_err();
        assert!(matches!(err, VoucherError::IssuedDateMismatch));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "VCH:25080612345",
            "VCH:25080612345|TS:202508061200",
            "TS:202508061200|VCH:25080612345|SIG:ab",
            "VCH:25080612345|TS:20250806|SIG:ab",
            "VCH:25080612345|TS:202508061200|SIG:ab|X:1",
            "VCH:|TS:202508061200|SIG:ab",
        ] {
            assert!(PayloadCodec::parse(bad).is_err(), "accepted: {bad}");
        }
    }

    #[test]
    fn test_garbage_signature_hex() {
        let voucher = issued_voucher();
        let ts = voucher.issued_at.unwrap().format(TS_FORMAT);
        let payload = format!("VCH:{}|TS:{}|SIG:zzzz", voucher.serial_no, ts);
        let err = codec().verify(&payload, &voucher).unwrap_err();
        assert!(matches!(err, VoucherError::InvalidSignature));
    }
}
