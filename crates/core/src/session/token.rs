//! Session value and embedded-expiry decoding.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A bearer token and the Unix time (seconds) it stops being valid.
///
/// Sessions are replaced wholesale, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	pub token: String,
	pub expiry: u64,
}

impl Session {
	/// Builds a session from a freshly issued token, reading its `exp` claim.
	pub fn from_token(token: String) -> Result<Self> {
		let expiry = decode_expiry(&token)?;
		Ok(Self { token, expiry })
	}

	/// Whether the token is still usable at `now`, keeping `leeway` in reserve.
	pub fn is_valid_at(&self, now: u64, leeway: Duration) -> bool {
		self.expiry > now.saturating_add(leeway.as_secs())
	}

	pub fn is_valid(&self, leeway: Duration) -> bool {
		self.is_valid_at(now_ts(), leeway)
	}
}

#[derive(Deserialize)]
struct Claims {
	exp: Option<f64>,
}

/// Reads the `exp` claim of a `header.payload.signature` token.
pub fn decode_expiry(token: &str) -> Result<u64> {
	let payload = token
		.split('.')
		.nth(1)
		.filter(|segment| !segment.is_empty())
		.ok_or_else(|| Error::Auth("token has no claims segment".into()))?;
	let bytes = URL_SAFE_NO_PAD
		.decode(payload.trim_end_matches('='))
		.map_err(|e| Error::Auth(format!("token claims are not base64url: {e}")))?;
	let claims: Claims = serde_json::from_slice(&bytes).map_err(|e| Error::Auth(format!("token claims are not JSON: {e}")))?;
	let exp = claims.exp.ok_or_else(|| Error::Auth("token carries no expiry claim".into()))?;
	if !exp.is_finite() || exp < 0.0 {
		return Err(Error::Auth(format!("token expiry claim is out of range: {exp}")));
	}
	Ok(exp as u64)
}

/// Current Unix time in seconds.
pub fn now_ts() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
