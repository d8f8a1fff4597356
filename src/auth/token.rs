//! Access token payload decoding
//!
//! Tokens are decoded without verifying their signature: the client only
//! reads the claims for role gating and expiry checks, the server validates
//! every request on its own.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;

use super::session::Claims;

/// Decode the claims segment of a JWT.
///
/// Returns `None` for anything that is not a three-segment token carrying a
/// base64url payload with the expected claims.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    let payload = URL_SAFE_NO_PAD.decode(segments[1]).ok()?;
    serde_json::from_slice(&payload).ok()
}

/// Whether a token is past its expiry claim.
///
/// Undecodable tokens count as expired. The comparison stays in seconds,
/// the unit `exp` is expressed in, so no claim value can overflow it.
pub fn is_expired(token: &str) -> bool {
    match decode_claims(token) {
        Some(claims) => claims.exp < Utc::now().timestamp(),
        None => true,
    }
}
