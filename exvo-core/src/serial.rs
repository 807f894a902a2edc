//! Serial number generation
//!
//! Serials are 11 characters: a `YYMMDD` date prefix followed by a 5-digit
//! random segment whose final digit serves as the check digit. Values are
//! not unique by construction; callers verify against the store (and against
//! rows already accepted in the same bulk request) and retry, bounded by
//! [`crate::ops::OpsConfig::serial_attempts`].

use chrono::Utc;
use rand::Rng;

/// Total serial length: 6 date characters + 5 random digits
pub const SERIAL_LEN: usize = 11;

/// Generate one candidate serial number. Stateless; no side effects.
pub fn generate() -> String {
    let prefix = Utc::now().format("%y%m%d");
    let mut rng = rand::thread_rng();
    let mut serial = prefix.to_string();
    for _ in 0..5 {
        serial.push(char::from(b'0' + rng.gen_range(0..10)));
    }
    serial
}

/// Shape check: exactly [`SERIAL_LEN`] ASCII digits
pub fn is_wellformed(serial: &str) -> bool {
    serial.len() == SERIAL_LEN && serial.bytes().all(|b| b.is_ascii_digit())
}
