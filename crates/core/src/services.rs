//! Component wiring.

use std::sync::Arc;

use snapfilter_runtime::{Connector, WebSocketConnector};
use tracing::debug;

use crate::api::ApiClient;
use crate::catalog::CatalogClient;
use crate::config::ClientConfig;
use crate::controller::EditSessionController;
use crate::error::Result;
use crate::jobs::JobSubmitter;
use crate::listener::{ListenerSettings, ProcessingListener};
use crate::session::{FileTokenStore, MemoryTokenStore, SessionManager, TokenStore};
use crate::uploader::ResourceUploader;

/// Every component, built once from a configuration and shared.
///
/// The session manager and listener are client-wide singletons; every other
/// component holds them through these `Arc`s.
pub struct Services {
	pub config: ClientConfig,
	pub api: Arc<ApiClient>,
	pub session: Arc<SessionManager>,
	pub catalog: Arc<CatalogClient>,
	pub uploader: Arc<ResourceUploader>,
	pub submitter: Arc<JobSubmitter>,
	pub listener: Arc<ProcessingListener>,
}

impl Services {
	/// Production wiring: file or memory token store and the WebSocket connector.
	pub fn from_config(config: ClientConfig) -> Result<Self> {
		let store: Arc<dyn TokenStore> = match &config.token_store {
			Some(path) => Arc::new(FileTokenStore::new(path)),
			None => Arc::new(MemoryTokenStore::new()),
		};
		Self::with_parts(config, store, Arc::new(WebSocketConnector))
	}

	pub fn with_parts(config: ClientConfig, store: Arc<dyn TokenStore>, connector: Arc<dyn Connector>) -> Result<Self> {
		config.validate()?;
		debug!(target = "snapfilter.services", api = %config.api_base_url, push = %config.push_url, "wiring services");

		let api = Arc::new(ApiClient::new(&config)?);
		let session = Arc::new(SessionManager::new(Arc::clone(&api), store, &config));
		let catalog = Arc::new(CatalogClient::new(Arc::clone(&api), Arc::clone(&session), config.duplicate_filters));
		let uploader = Arc::new(ResourceUploader::new(Arc::clone(&api), Arc::clone(&session)));
		let submitter = Arc::new(JobSubmitter::new(Arc::clone(&api), Arc::clone(&session)));
		let listener = Arc::new(ProcessingListener::new(connector, ListenerSettings::from_config(&config)?));

		Ok(Self {
			config,
			api,
			session,
			catalog,
			uploader,
			submitter,
			listener,
		})
	}

	/// A new edit session over the shared components.
	pub fn edit_session(&self) -> EditSessionController {
		EditSessionController::new(
			Arc::clone(&self.session),
			Arc::clone(&self.uploader),
			Arc::clone(&self.submitter),
			Arc::clone(&self.listener),
		)
	}
}
