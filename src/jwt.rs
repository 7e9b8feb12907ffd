//! Access-token expiry inspection.
//!
//! Tokens are never verified here, only peeked at: the payload segment is
//! base64url-decoded and its `exp` claim compared against the clock. Any
//! decode problem is logged and reported as "not expiring" so a malformed
//! token falls through to the server, which answers 401 and drives the
//! reactive refresh path instead.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

/// Tokens expiring sooner than this are refreshed before use.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, thiserror::Error)]
pub(crate) enum DecodeError {
    #[error("token has no payload segment")]
    MissingSegment,
    #[error("payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not a JSON claims object: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct ExpiryClaims {
    exp: f64,
}

/// Whether `token` expires within [`EXPIRY_MARGIN`] of now.
#[must_use]
pub fn expires_soon(token: &str) -> bool {
    expires_soon_at(token, SystemTime::now())
}

/// Whether `token` expires within [`EXPIRY_MARGIN`] of `now`.
#[must_use]
pub fn expires_soon_at(token: &str, now: SystemTime) -> bool {
    match decode_exp(token) {
        Ok(exp) => {
            let remaining_ms = exp * 1000.0 - epoch_ms(now);
            #[allow(clippy::cast_precision_loss)]
            let margin_ms = EXPIRY_MARGIN.as_millis() as f64;
            remaining_ms < margin_ms
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not decode access token expiry");
            false
        }
    }
}

/// Read the `exp` claim (Unix seconds) from a JWT payload.
pub(crate) fn decode_exp(token: &str) -> Result<f64, DecodeError> {
    let payload = token.split('.').nth(1).filter(|s| !s.is_empty()).ok_or(DecodeError::MissingSegment)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    let claims: ExpiryClaims = serde_json::from_slice(&bytes)?;
    Ok(claims.exp)
}

#[allow(clippy::cast_precision_loss)]
fn epoch_ms(now: SystemTime) -> f64 {
    now.duration_since(UNIX_EPOCH).map_or(0.0, |d| d.as_millis() as f64)
}

#[cfg(test)]
#[path = "jwt_test.rs"]
mod tests;
