//! Temporary credential issuance (`POST /temp-auth`).

use serde::{Deserialize, Serialize};

/// Issuance endpoint, relative to the API base.
pub const TEMP_AUTH_PATH: &str = "/temp-auth";

/// Header carrying the session token on every authenticated request.
pub const AUTH_HEADER: &str = "api-auth-key";

/// Body of a temporary credential request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempAuthRequest {
	/// Client-generated correlation identifier.
	pub temp_id: String,
}

/// Issuance response.
///
/// The token is optional here so an empty response body can be reported as a
/// missing token rather than a generic decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempAuthResponse {
	#[serde(rename = "auth-token", default, skip_serializing_if = "Option::is_none")]
	pub auth_token: Option<String>,
}
