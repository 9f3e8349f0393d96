//! Session issuance with single-flight refresh.

use std::sync::Arc;
use std::time::Duration;

use snapfilter_protocol::{TEMP_AUTH_PATH, TempAuthRequest, TempAuthResponse};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::store::TokenStore;
use super::token::Session;
use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, retry_async};

/// Owner of the session credential.
///
/// The check-and-issue section runs under an async lock, so callers that all
/// find the token expired wait for one issuance request and share its token.
pub struct SessionManager {
	api: Arc<ApiClient>,
	store: Arc<dyn TokenStore>,
	current: Mutex<Option<Session>>,
	retry: RetryPolicy,
	leeway: Duration,
}

impl SessionManager {
	/// Creates a manager, adopting any session already in `store`.
	pub fn new(api: Arc<ApiClient>, store: Arc<dyn TokenStore>, config: &ClientConfig) -> Self {
		let stored = match store.load() {
			Ok(stored) => stored,
			Err(err) => {
				warn!(target = "snapfilter.session", error = %err, "ignoring unreadable stored session");
				None
			}
		};
		if let Some(session) = &stored {
			debug!(target = "snapfilter.session", expiry = session.expiry, "loaded stored session");
		}

		Self {
			api,
			store,
			current: Mutex::new(stored),
			retry: config.auth_retry.clone(),
			leeway: config.token_leeway(),
		}
	}

	/// Returns a token that is valid now, issuing a new one when needed.
	pub async fn ensure_valid_token(&self) -> Result<String> {
		let mut current = self.current.lock().await;
		if let Some(session) = current.as_ref().filter(|s| s.is_valid(self.leeway)) {
			return Ok(session.token.clone());
		}

		let session = retry_async(&self.retry, "token issuance", Error::is_auth, || self.issue()).await?;
		info!(target = "snapfilter.session", expiry = session.expiry, "issued session token");

		if let Err(err) = self.store.save(&session) {
			warn!(target = "snapfilter.session", error = %err, "failed to persist session token");
		}
		let token = session.token.clone();
		*current = Some(session);
		Ok(token)
	}

	/// The held session, valid or not.
	pub async fn current_session(&self) -> Option<Session> {
		self.current.lock().await.clone()
	}

	/// Drops the held and persisted session. Returns whether one was persisted.
	pub async fn clear(&self) -> Result<bool> {
		let mut current = self.current.lock().await;
		*current = None;
		self.store.clear()
	}

	async fn issue(&self) -> Result<Session> {
		let request = TempAuthRequest {
			temp_id: Uuid::new_v4().to_string(),
		};
		debug!(target = "snapfilter.session", temp_id = %request.temp_id, "requesting session token");

		let response: TempAuthResponse = self
			.api
			.post_json(TEMP_AUTH_PATH, None, &request)
			.await
			.map_err(|e| Error::Auth(e.to_string()))?;
		let token = response
			.auth_token
			.filter(|token| !token.is_empty())
			.ok_or_else(|| Error::Auth("issuance response carried no token".into()))?;
		Session::from_token(token)
	}
}
