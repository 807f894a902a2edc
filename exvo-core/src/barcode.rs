//! CODE128 checksum support for rendered scan codes
//!
//! Rendering is out of scope, but third-party scanner hardware expects a
//! correct modulo-103 check symbol, so the computation lives here. Payload
//! strings use code set B (printable ASCII).

/// Start symbol value for code set B
pub const START_B: u8 = 104;

/// Symbol value of a character in code set B, if encodable
pub fn code_set_b_value(c: char) -> Option<u8> {
    let b = u32::from(c);
    if (32..=127).contains(&b) {
        Some((b - 32) as u8)
    } else {
        None
    }
}

/// Modulo-103 check symbol for `data` encoded in code set B.
///
/// Returns `None` if any character falls outside the code set.
pub fn code128_checksum(data: &str) -> Option<u8> {
    let mut sum = u32::from(START_B);
    for (i, c) in data.chars().enumerate() {
        let value = u32::from(code_set_b_value(c)?);
        sum += value * (i as u32 + 1);
    }
    Some((sum % 103) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_values() {
        assert_eq!(code_set_b_value(' '), Some(0));
        assert_eq!(code_set_b_value('!'), Some(1));
        assert_eq!(code_set_b_value('A'), Some(33));
        assert_eq!(code_set_b_value('a'), Some(65));
        assert_eq!(code_set_b_value('\n'), None);
        assert_eq!(code_set_b_value('한'), None);
    }

    #[test]
    fn test_checksum_known_vectors() {
        // "A": (104 + 33*1) % 103 = 34
        assert_eq!(code128_checksum("A"), Some(34));
        // "AB": (104 + 33*1 + 34*2) % 103 = 205 % 103 = 102
        assert_eq!(code128_checksum("AB"), Some(102));
        // Empty data: just the start symbol
        assert_eq!(code128_checksum(""), Some(104 % 103));
    }

    #[test]
    fn test_checksum_covers_payload_alphabet() {
        let payload = "VCH:25080612345|TS:202508061200|SIG:0a1b2c";
        assert!(code128_checksum(payload).is_some());
    }

    #[test]
    fn test_checksum_rejects_unencodable() {
        assert_eq!(code128_checksum("줄\n"), None);
    }
}
