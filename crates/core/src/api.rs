//! HTTP access to the filter service.
//!
//! The client holds no credential of its own. Every authenticated call takes
//! the token explicitly so the session manager stays the only owner of it.

use reqwest::RequestBuilder;
use reqwest::multipart::Form;
use serde::Serialize;
use serde::de::DeserializeOwned;
use snapfilter_protocol::AUTH_HEADER;
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

const MAX_ERROR_BODY: usize = 200;

/// Why a single HTTP exchange failed. Components map this into their own
/// error kind (`Upload`, `Catalog`, ...).
#[derive(Debug, Error)]
pub enum RequestError {
	#[error("request timed out")]
	Timeout,

	#[error("unexpected status {status}: {body}")]
	Status { status: u16, body: String },

	#[error("transport error: {0}")]
	Transport(String),

	#[error("malformed response: {0}")]
	Decode(String),
}

impl From<reqwest::Error> for RequestError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_timeout() {
			Self::Timeout
		} else if err.is_decode() {
			Self::Decode(err.to_string())
		} else {
			Self::Transport(err.to_string())
		}
	}
}

#[derive(Debug, Clone)]
pub struct ApiClient {
	http: reqwest::Client,
	base_url: String,
}

impl ApiClient {
	pub fn new(config: &ClientConfig) -> Result<Self> {
		let http = reqwest::Client::builder()
			.timeout(config.request_timeout())
			.connect_timeout(config.connect_timeout())
			.build()
			.map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;
		Ok(Self {
			http,
			base_url: config.api_base_url.trim_end_matches('/').to_string(),
		})
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	pub async fn get_json<T: DeserializeOwned>(&self, path: &str, token: &str) -> std::result::Result<T, RequestError> {
		self.execute(self.http.get(self.url(path)).header(AUTH_HEADER, token)).await
	}

	/// Posts a JSON body. `token` is `None` only for credential issuance.
	pub async fn post_json<B, T>(&self, path: &str, token: Option<&str>, body: &B) -> std::result::Result<T, RequestError>
	where
		B: Serialize + ?Sized,
		T: DeserializeOwned,
	{
		let mut request = self.http.post(self.url(path)).json(body);
		if let Some(token) = token {
			request = request.header(AUTH_HEADER, token);
		}
		self.execute(request).await
	}

	pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, token: &str, form: Form) -> std::result::Result<T, RequestError> {
		self.execute(self.http.post(self.url(path)).header(AUTH_HEADER, token).multipart(form)).await
	}

	async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> std::result::Result<T, RequestError> {
		let response = request.send().await?;
		let status = response.status();
		debug!(target = "snapfilter.http", url = %response.url(), %status, "response received");

		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(RequestError::Status {
				status: status.as_u16(),
				body: truncate(body),
			});
		}

		let bytes = response.bytes().await?;
		serde_json::from_slice(&bytes).map_err(|e| RequestError::Decode(e.to_string()))
	}
}

fn truncate(mut body: String) -> String {
	if body.len() > MAX_ERROR_BODY {
		let mut cut = MAX_ERROR_BODY;
		while !body.is_char_boundary(cut) {
			cut -= 1;
		}
		body.truncate(cut);
		body.push_str("...");
	}
	body
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn base_url_trailing_slash_is_trimmed() {
		let config = ClientConfig {
			api_base_url: "http://127.0.0.1:9000/api/v1/".into(),
			..ClientConfig::default()
		};
		let api = ApiClient::new(&config).unwrap();
		assert_eq!(api.url("/temp-auth"), "http://127.0.0.1:9000/api/v1/temp-auth");
	}

	#[test]
	fn long_error_bodies_are_truncated_on_char_boundary() {
		let body = "é".repeat(150);
		let truncated = truncate(body);
		assert!(truncated.ends_with("..."));
		assert!(truncated.len() <= MAX_ERROR_BODY + 3);
	}
}
