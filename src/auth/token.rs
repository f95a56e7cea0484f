//! Bearer token extraction.
//!
//! Both services accept credentials only as
//!
//! ```text
//! Authorization: Bearer <token>
//! ```
//!
//! The scheme is matched case-insensitively. Anything else (absent header,
//! other scheme, empty token) is treated as "no token" and answered with
//! 401 `missing_token` before any backend call.

use http::header::AUTHORIZATION;
use http::HeaderMap;
use sha2::{Digest, Sha256};

/// Hex characters of the SHA-256 digest kept in a token fingerprint.
const FINGERPRINT_LEN: usize = 12;

/// Extract the bearer token from request headers.
///
/// The header value is split on a single space into scheme and token; the
/// token is trimmed and must be non-empty.
pub fn parse_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;

    let mut parts = value.split(' ');
    let scheme = parts.next()?;
    let token = parts.next()?.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }

    Some(token.to_string())
}

/// Short, non-reversible identifier for a token, safe to put in logs.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}
