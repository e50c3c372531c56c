//! Local usability check for a held credential.
//!
//! Fail-closed: a missing token, a token that does not decode, and a token
//! without an `exp` claim are all treated as expired. There is no clock-skew
//! allowance.

use chrono::Utc;
use tracing::debug;

use super::codec;

/// Whether `token` may still be presented, judged against the wall clock.
pub fn is_usable(token: Option<&str>) -> bool {
    is_usable_at(token, Utc::now().timestamp())
}

/// Whether `token` is usable at `now` (epoch seconds).
pub fn is_usable_at(token: Option<&str>, now: i64) -> bool {
    let Some(token) = token else {
        return false;
    };

    let claims = match codec::decode(token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Credential failed to decode, treating as expired");
            return false;
        }
    };

    match claims.exp() {
        Some(exp) if exp != 0.0 && !exp.is_nan() => (now as f64) < exp,
        _ => false,
    }
}

/// Seconds left on the wall clock before `token` expires.
pub fn seconds_until_expiry(token: &str) -> Option<i64> {
    seconds_remaining(token, Utc::now().timestamp())
}

/// Seconds left before `token` expires, or `None` if it is not usable.
pub fn seconds_remaining(token: &str, now: i64) -> Option<i64> {
    if !is_usable_at(Some(token), now) {
        return None;
    }
    let exp = codec::decode(token).ok()?.exp()?;
    Some((exp.ceil() as i64 - now).max(0))
}
