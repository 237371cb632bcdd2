//! Structural and expiry checks for bearer tokens
//!
//! The expiry claim is read straight out of the JWT payload without checking
//! the signature. Anything that cannot be decoded is reported as expired.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Current unix time in seconds. A clock set before the epoch makes every token expired.
pub(crate) fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(i64::MAX)
}

/// Decode the payload segment of a compact JWT into a JSON object
fn decode_payload(token: &str) -> Option<serde_json::Map<String, Value>> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() || payload.is_empty() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// Read the `exp` claim (unix seconds) of a token, if it has a well-formed one
pub fn expiration(token: &str) -> Option<i64> {
    let claims = decode_payload(token)?;
    match claims.get("exp")? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        _ => None,
    }
}

/// Check whether a token is expired at `now`, allowing `leeway` seconds of clock skew
pub fn is_expired_at(token: &str, now: i64, leeway: u64) -> bool {
    match expiration(token) {
        Some(exp) => exp.saturating_add(leeway as i64) <= now,
        None => true,
    }
}

/// Check whether a token is expired right now.
///
/// Empty, malformed, or `exp`-less tokens count as expired.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_unix(), 0)
}

/// Short, non-reversible label for a token, safe to put in logs
pub fn fingerprint(token: &str) -> String {
    let tail: String = token.chars().rev().take(6).collect::<Vec<_>>().into_iter().rev().collect();
    format!("…{} ({} bytes)", tail, token.len())
}

/// Expiry validator with a configurable clock-skew allowance
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenValidator {
    leeway_secs: u64,
}

impl TokenValidator {
    pub fn new(leeway_secs: u64) -> Self {
        Self { leeway_secs }
    }

    pub fn is_expired(&self, token: &str) -> bool {
        is_expired_at(token, now_unix(), self.leeway_secs)
    }
}
