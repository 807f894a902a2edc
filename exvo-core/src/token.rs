//! Secure link tokens for time-limited mobile access
//!
//! Tokens are opaque bearer credentials: possession grants access to the
//! associated batch (or voucher) until expiry, with no secondary factor.
//! Liveness is always re-checked against the store at access time; the
//! format check here proves shape only.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::Rng;

/// Generated token length
pub const TOKEN_LEN: usize = 32;

/// Accepted token length range for the shape check
pub const TOKEN_LEN_RANGE: std::ops::RangeInclusive<usize> = 16..=64;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// A freshly issued access token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues expiring, unguessable access tokens
#[derive(Debug, Clone)]
pub struct LinkTokenIssuer {
    base_url: String,
}

impl LinkTokenIssuer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Generate a token valid for `expiry_hours` from now
    pub fn issue(&self, expiry_hours: u32) -> IssuedToken {
        let mut rng = OsRng;
        let token: String = (0..TOKEN_LEN)
            .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
            .collect();
        let expires_at = Utc::now() + Duration::hours(i64::from(expiry_hours));
        let url = format!("{}/m/{}", self.base_url.trim_end_matches('/'), token);
        IssuedToken {
            token,
            url,
            expires_at,
        }
    }
}

/// Cheap shape check: URL-safe alphabet and plausible length. Says nothing
/// about whether the token is live or unexpired.
pub fn is_valid_token_format(token: &str) -> bool {
    TOKEN_LEN_RANGE.contains(&token.len()) && token.bytes().all(|b| ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_shape() {
        let issuer = LinkTokenIssuer::new("https://vouchers.example.org/");
        let issued = issuer.issue(24);
        assert_eq!(issued.token.len(), TOKEN_LEN);
        assert!(is_valid_token_format(&issued.token));
        assert_eq!(
            issued.url,
            format!("https://vouchers.example.org/m/{}", issued.token)
        );
        assert!(issued.expires_at > Utc::now() + Duration::hours(23));
    }

    #[test]
    fn test_tokens_are_distinct() {
        let issuer = LinkTokenIssuer::new("http://localhost");
        let a = issuer.issue(1).token;
        let b = issuer.issue(1).token;
        assert_ne!(a, b);
    }

    #[test]
    fn test_format_check() {
        assert!(is_valid_token_format("abcdefghijklmnop"));
        assert!(is_valid_token_format("abc-DEF_0123456789abcdef"));
        assert!(!is_valid_token_format("short"));
        assert!(!is_valid_token_format(&"x".repeat(65)));
        assert!(!is_valid_token_format("has space 1234567"));
        assert!(!is_valid_token_format("quoted!@#$%^&*()1234"));
    }
}
