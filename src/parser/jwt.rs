use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::error::TokenError;

#[derive(Debug, Deserialize)]
pub struct JwtClaims {
    pub exp: Option<u64>,
}

/// Read the `exp` claim (unix seconds) from a JWT without verifying its signature.
///
/// An expired `exp` is returned as is; deciding freshness is the caller's job.
pub fn decode_expiration(token: &str) -> Result<u64, TokenError> {
    let claims = decode_claims(token)?;
    let exp = claims
        .exp
        .ok_or_else(|| TokenError::Protocol("JWT payload has no exp claim".into()))?;
    debug!(expires_at = exp, "jwt parsed successfully");
    Ok(exp)
}

pub fn decode_claims(token: &str) -> Result<JwtClaims, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::Protocol(format!(
            "invalid JWT format: expected 3 segments, got {}",
            parts.len()
        )));
    }

    let payload = decode_segment(parts[1])?;
    serde_json::from_slice::<JwtClaims>(&payload)
        .map_err(|e| TokenError::Protocol(format!("invalid JWT payload: {}", e)))
}

// JWTs use the url-safe alphabet; standard alphabet and padding are tolerated.
fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    let trimmed = segment.trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(TokenError::Protocol("JWT payload segment is empty".into()));
    }
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|e| TokenError::Protocol(format!("base64 decode error: {}", e)))
}
