//! Structural decoding of bearer credentials.
//!
//! A credential is three dot-separated base64url segments (header, claims,
//! signature). Only the claims segment is decoded here and the signature is
//! never checked: the remote API verifies every real call, so local decoding
//! is a scheduling hint, not a trust boundary.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde_json::{Map, Value};
use thiserror::Error;

/// Segments arrive unpadded from the issuer but may be padded by other
/// producers, and stray trailing bits are tolerated the way browser `atob` does.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed credential: {0}")]
    Malformed(&'static str),
}

/// Decoded claims of a credential.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    exp: Option<f64>,
    fields: Map<String, Value>,
}

impl Claims {
    /// Expiry as epoch seconds, if the issuer set one.
    pub fn exp(&self) -> Option<f64> {
        self.exp
    }

    /// Subject claim. The remote authority stores the user id here.
    pub fn subject(&self) -> Option<&str> {
        self.fields.get("sub").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Decode the claims segment of `raw`.
///
/// Never panics and never propagates an inner decoding error: anything that
/// is not a three-segment token with a JSON object in the middle (and a
/// numeric or absent `exp`) is reported as [`DecodeError::Malformed`].
pub fn decode(raw: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = raw.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::Malformed("expected three segments"));
    }
    if segments.iter().any(|s| s.is_empty()) {
        return Err(DecodeError::Malformed("empty segment"));
    }

    let normalized = segments[1].replace('-', "+").replace('_', "/");
    let bytes = SEGMENT_ENGINE
        .decode(normalized.as_bytes())
        .map_err(|_| DecodeError::Malformed("claims segment is not base64"))?;
    let text =
        String::from_utf8(bytes).map_err(|_| DecodeError::Malformed("claims are not UTF-8"))?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|_| DecodeError::Malformed("claims are not JSON"))?;

    let Value::Object(fields) = value else {
        return Err(DecodeError::Malformed("claims are not an object"));
    };

    let exp = match fields.get("exp") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(_) => return Err(DecodeError::Malformed("exp is not numeric")),
    };

    Ok(Claims { exp, fields })
}

#[cfg(test)]
pub(crate) fn encode_for_test(claims: &Value) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, body)
}
