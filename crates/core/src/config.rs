//! Client configuration.
//!
//! Every field has a default so a configuration file only needs the values it
//! overrides:
//!
//! ```json
//! {
//!   "apiBaseUrl": "https://filters.example.com/api/v1",
//!   "processingTimeoutMs": 300000,
//!   "duplicateFilters": "perCategory"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::catalog::DuplicateFilterPolicy;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

pub const DEFAULT_API_BASE_URL: &str = "https://app.nufa.ai/api/v1";
pub const DEFAULT_PUSH_URL: &str = "wss://app-webs.nufa.ai";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
	/// Base URL every HTTP endpoint path is appended to.
	pub api_base_url: String,
	/// Push channel endpoint.
	pub push_url: String,
	/// Upper bound for each HTTP request, including reading the body.
	pub request_timeout_ms: u64,
	pub connect_timeout_ms: u64,
	/// Upper bound for the whole wait on a job result, across reconnects.
	pub processing_timeout_ms: u64,
	/// Tokens expiring within this window are treated as already expired.
	pub token_leeway_secs: u64,
	pub auth_retry: RetryPolicy,
	pub channel_retry: RetryPolicy,
	pub duplicate_filters: DuplicateFilterPolicy,
	/// Where the session token is persisted. `None` keeps it in memory only.
	pub token_store: Option<PathBuf>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			api_base_url: DEFAULT_API_BASE_URL.to_string(),
			push_url: DEFAULT_PUSH_URL.to_string(),
			request_timeout_ms: 30_000,
			connect_timeout_ms: 10_000,
			processing_timeout_ms: 180_000,
			token_leeway_secs: 30,
			auth_retry: RetryPolicy::default(),
			channel_retry: RetryPolicy::default(),
			duplicate_filters: DuplicateFilterPolicy::default(),
			token_store: None,
		}
	}
}

impl ClientConfig {
	/// Loads a configuration file and validates it.
	pub fn load(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path).map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
		let config: Self = serde_json::from_str(&content).map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		let api = parse_url("apiBaseUrl", &self.api_base_url)?;
		if !matches!(api.scheme(), "http" | "https") {
			return Err(Error::Config(format!("apiBaseUrl must be http or https, got {}", api.scheme())));
		}

		let push = parse_url("pushUrl", &self.push_url)?;
		if !matches!(push.scheme(), "ws" | "wss") {
			return Err(Error::Config(format!("pushUrl must be ws or wss, got {}", push.scheme())));
		}

		for (name, value) in [
			("requestTimeoutMs", self.request_timeout_ms),
			("connectTimeoutMs", self.connect_timeout_ms),
			("processingTimeoutMs", self.processing_timeout_ms),
		] {
			if value == 0 {
				return Err(Error::Config(format!("{name} must be greater than zero")));
			}
		}
		Ok(())
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	pub fn connect_timeout(&self) -> Duration {
		Duration::from_millis(self.connect_timeout_ms)
	}

	pub fn processing_timeout(&self) -> Duration {
		Duration::from_millis(self.processing_timeout_ms)
	}

	pub fn token_leeway(&self) -> Duration {
		Duration::from_secs(self.token_leeway_secs)
	}
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
	Url::parse(value).map_err(|e| Error::Config(format!("{field} is not a valid URL ({value}): {e}")))
}
