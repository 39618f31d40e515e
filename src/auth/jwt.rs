//! Unverified JWT inspection for manually supplied tokens.
//!
//! Only structure and the `exp` claim are checked. Signature, audience and
//! issuer are validated by the OSDU platform when the token is presented.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Claims of interest from a decoded token payload.
#[derive(Debug, Clone)]
pub struct JwtClaims {
    pub expires_at: Option<DateTime<Utc>>,
    pub claims: Map<String, Value>,
}

/// Decode a JWT without verifying its signature.
pub fn decode_unverified(token: &str) -> Result<JwtClaims> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(Error::MalformedToken(format!(
            "expected 3 dot-separated segments, found {}",
            segments.len()
        )));
    }

    let header = decode_segment(segments[0], "header")?;
    parse_object(&header, "header")?;

    let payload = decode_segment(segments[1], "payload")?;
    let claims = parse_object(&payload, "payload")?;

    if !segments[2].is_empty() {
        decode_segment(segments[2], "signature")?;
    }

    let expires_at = match claims.get("exp") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => {
            let secs = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.floor() as i64))
                .ok_or_else(|| Error::MalformedToken("exp claim out of range".into()))?;
            Some(
                DateTime::from_timestamp(secs, 0)
                    .ok_or_else(|| Error::MalformedToken("exp claim out of range".into()))?,
            )
        }
        Some(_) => return Err(Error::MalformedToken("exp claim must be numeric".into())),
    };

    Ok(JwtClaims { expires_at, claims })
}

fn decode_segment(segment: &str, part: &str) -> Result<Vec<u8>> {
    if segment.is_empty() {
        return Err(Error::MalformedToken(format!("empty {} segment", part)));
    }
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| Error::MalformedToken(format!("{} is not base64url: {}", part, e)))
}

fn parse_object(bytes: &[u8], part: &str) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::MalformedToken(format!(
            "{} is not a JSON object",
            part
        ))),
        Err(e) => Err(Error::MalformedToken(format!(
            "{} is not valid JSON: {}",
            part, e
        ))),
    }
}

/// Build an unsigned test token with the given payload.
#[cfg(test)]
pub(crate) fn encode_unsigned(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    let signature = URL_SAFE_NO_PAD.encode(b"signature");
    format!("{}.{}.{}", header, body, signature)
}
