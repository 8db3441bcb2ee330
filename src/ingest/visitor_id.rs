//! Server-side pseudonymous visitor identity for beacons that carry none.
//!
//! The identity is `HMAC-SHA256(ip | user_agent)` under a salt that rotates
//! with the UTC date, so the same browser maps to the same id within a day
//! and to an unrelated one the next. IP addresses are never stored.

use axum::http::HeaderMap;
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn hmac_hex(key: &[u8], parts: &[&[u8]]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            mac.update(b"|");
        }
        mac.update(part);
    }
    hex::encode(mac.finalize().into_bytes())
}

/// Derive the salt for `date` from the deployment secret.
pub fn daily_salt(secret: &str, date: NaiveDate) -> String {
    let input = format!("{secret}:{date}");
    hmac_hex(b"sitepulse-visitor-salt", &[input.as_bytes()])
}

/// Hash client signals into a visitor id under `salt`.
pub fn derive_visitor_id(ip: &str, user_agent: &str, salt: &str) -> String {
    hmac_hex(salt.as_bytes(), &[ip.as_bytes(), user_agent.as_bytes()])
}

/// Use the client-supplied id when present, otherwise derive one.
pub fn resolve_visitor_id(
    supplied: Option<&str>,
    ip: &str,
    user_agent: &str,
    secret: &str,
    date: NaiveDate,
) -> String {
    supplied.map_or_else(
        || derive_visitor_id(ip, user_agent, &daily_salt(secret, date)),
        str::to_string,
    )
}

/// Extract client IP from headers, checking X-Forwarded-For first.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .unwrap_or("unknown")
        .to_string()
}
