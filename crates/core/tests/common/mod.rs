//! Shared fixtures: an in-process mock of the filter service HTTP API and
//! helpers for building clients against it.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;
use serde_json::{Value, json};
use snapfilter::session::now_ts;
use snapfilter::{ClientConfig, MemoryTokenStore, RetryPolicy, Services, TokenStore};
use snapfilter_runtime::{Connector, FakeConnection, FakeConnector};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

pub const PUSH_URL: &str = "ws://push.test/ws";

/// Builds an unsigned `header.payload.sig` token whose `exp` is `secs` from now.
pub fn token_expiring_in(secs: i64) -> String {
	let exp = now_ts() as i64 + secs;
	format!(
		"{}.{}.sig",
		URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
		URL_SAFE_NO_PAD.encode(json!({ "exp": exp, "sub": "anon" }).to_string())
	)
}

/// One multipart upload as the server saw it.
#[derive(Debug, Clone)]
pub struct UploadRecord {
	pub token: Option<String>,
	pub part_name: String,
	pub file_name: Option<String>,
	pub content_type: Option<String>,
	pub bytes: Vec<u8>,
	pub manifest: Value,
}

/// Parks one request until the test releases it.
pub struct Hold {
	arrived: oneshot::Sender<()>,
	release: oneshot::Receiver<()>,
}

/// Test side of a [`Hold`].
pub struct HoldHandle {
	pub arrived: oneshot::Receiver<()>,
	pub release: oneshot::Sender<()>,
}

pub fn hold() -> (Hold, HoldHandle) {
	let (arrived_tx, arrived_rx) = oneshot::channel();
	let (release_tx, release_rx) = oneshot::channel();
	(
		Hold {
			arrived: arrived_tx,
			release: release_rx,
		},
		HoldHandle {
			arrived: arrived_rx,
			release: release_tx,
		},
	)
}

impl Hold {
	async fn park(self) {
		let _ = self.arrived.send(());
		let _ = self.release.await;
	}
}

impl HoldHandle {
	pub async fn wait_arrived(&mut self) {
		tokio::time::timeout(Duration::from_secs(5), &mut self.arrived)
			.await
			.expect("timed out waiting for held request")
			.expect("hold dropped");
	}
}

pub struct MockState {
	pub auth_calls: AtomicUsize,
	pub auth_delay: Mutex<Duration>,
	/// `None` issues a fresh token valid for an hour.
	pub auth_response: Mutex<Option<(StatusCode, Value)>>,
	pub temp_ids: Mutex<Vec<String>>,
	/// Parks the next issuance request.
	pub auth_hold: Mutex<Option<Hold>>,
	pub upload_response: Mutex<(StatusCode, Value)>,
	pub uploads: Mutex<Vec<UploadRecord>>,
	pub catalog_response: Mutex<(StatusCode, Value)>,
	pub catalog_tokens: Mutex<Vec<Option<String>>>,
	/// `None` answers with sequential action ids `a1`, `a2`, ...
	pub submit_response: Mutex<Option<(StatusCode, Value)>>,
	pub submissions: Mutex<Vec<Value>>,
	/// Parks the next submission request.
	pub submit_hold: Mutex<Option<Hold>>,
}

impl Default for MockState {
	fn default() -> Self {
		Self {
			auth_calls: AtomicUsize::new(0),
			auth_delay: Mutex::new(Duration::ZERO),
			auth_response: Mutex::new(None),
			temp_ids: Mutex::new(Vec::new()),
			auth_hold: Mutex::new(None),
			upload_response: Mutex::new((StatusCode::OK, json!([{ "id": "r1" }]))),
			uploads: Mutex::new(Vec::new()),
			catalog_response: Mutex::new((StatusCode::OK, json!([]))),
			catalog_tokens: Mutex::new(Vec::new()),
			submit_response: Mutex::new(None),
			submissions: Mutex::new(Vec::new()),
			submit_hold: Mutex::new(None),
		}
	}
}

impl MockState {
	pub fn auth_calls(&self) -> usize {
		self.auth_calls.load(Ordering::SeqCst)
	}
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
	headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

async fn temp_auth(State(mock): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
	mock.auth_calls.fetch_add(1, Ordering::SeqCst);
	if let Some(temp_id) = body["temp_id"].as_str() {
		mock.temp_ids.lock().push(temp_id.to_string());
	}
	let held = mock.auth_hold.lock().take();
	if let Some(held) = held {
		held.park().await;
	}
	let delay = *mock.auth_delay.lock();
	if !delay.is_zero() {
		tokio::time::sleep(delay).await;
	}
	let configured = mock.auth_response.lock().clone();
	match configured {
		Some((status, body)) => (status, Json(body)).into_response(),
		None => Json(json!({ "auth-token": token_expiring_in(3600) })).into_response(),
	}
}

async fn register_resource(State(mock): State<Arc<MockState>>, headers: HeaderMap, mut multipart: Multipart) -> Response {
	let mut record = UploadRecord {
		token: header(&headers, "api-auth-key"),
		part_name: String::new(),
		file_name: None,
		content_type: None,
		bytes: Vec::new(),
		manifest: Value::Null,
	};
	while let Ok(Some(field)) = multipart.next_field().await {
		let name = field.name().unwrap_or_default().to_string();
		if name == "config" {
			let text = field.text().await.unwrap_or_default();
			record.manifest = serde_json::from_str(&text).unwrap_or(Value::Null);
		} else {
			record.part_name = name;
			record.file_name = field.file_name().map(str::to_string);
			record.content_type = field.content_type().map(str::to_string);
			record.bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
		}
	}
	mock.uploads.lock().push(record);

	let (status, body) = mock.upload_response.lock().clone();
	(status, Json(body)).into_response()
}

async fn home_filters(State(mock): State<Arc<MockState>>, headers: HeaderMap) -> Response {
	mock.catalog_tokens.lock().push(header(&headers, "api-auth-key"));
	let (status, body) = mock.catalog_response.lock().clone();
	(status, Json(body)).into_response()
}

async fn action_sequence(State(mock): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
	let count = {
		let mut submissions = mock.submissions.lock();
		submissions.push(body);
		submissions.len()
	};
	let held = mock.submit_hold.lock().take();
	if let Some(held) = held {
		held.park().await;
	}
	let configured = mock.submit_response.lock().clone();
	match configured {
		Some((status, body)) => (status, Json(body)).into_response(),
		None => Json(json!([{ "action_id": format!("a{count}") }])).into_response(),
	}
}

/// Serves the mock API on an ephemeral port and returns its API base URL.
pub async fn spawn_api(mock: Arc<MockState>) -> String {
	let app = Router::new()
		.route("/api/v1/temp-auth", post(temp_auth))
		.route("/api/v1/photo/register-resource", post(register_resource))
		.route("/api/v1/configs/home-filters", get(home_filters))
		.route("/api/v1/photo/action-sequence", post(action_sequence))
		.with_state(mock);

	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	format!("http://{addr}/api/v1")
}

/// Routes core logs to the captured test output.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_max_level(tracing::Level::DEBUG)
		.with_test_writer()
		.try_init();
}

pub fn fast_retry(attempts: u32) -> RetryPolicy {
	RetryPolicy {
		attempts,
		initial_delay_ms: 5,
		max_delay_ms: 20,
		multiplier: 2.0,
	}
}

pub fn test_config(api_base_url: &str) -> ClientConfig {
	ClientConfig {
		api_base_url: api_base_url.to_string(),
		push_url: PUSH_URL.to_string(),
		request_timeout_ms: 5_000,
		connect_timeout_ms: 1_000,
		processing_timeout_ms: 5_000,
		auth_retry: fast_retry(2),
		channel_retry: fast_retry(1),
		..ClientConfig::default()
	}
}

/// A mock API, a fake push connector and services wired to both.
pub struct Harness {
	pub mock: Arc<MockState>,
	pub services: Services,
	pub connector: Arc<FakeConnector>,
	pub connections: mpsc::UnboundedReceiver<FakeConnection>,
}

impl Harness {
	pub async fn start() -> Self {
		Self::start_with(|_| {}, Arc::new(MemoryTokenStore::new())).await
	}

	pub async fn start_with(configure: impl FnOnce(&mut ClientConfig), store: Arc<dyn TokenStore>) -> Self {
		init_tracing();
		let mock = Arc::new(MockState::default());
		let base = spawn_api(Arc::clone(&mock)).await;
		let mut config = test_config(&base);
		configure(&mut config);

		let (connector, connections) = FakeConnector::new();
		let connector = Arc::new(connector);
		let services = Services::with_parts(config, store, Arc::clone(&connector) as Arc<dyn Connector>).unwrap();
		Self {
			mock,
			services,
			connector,
			connections,
		}
	}

	/// Waits for the next push connection and consumes its subscribe message.
	pub async fn next_subscription(&mut self) -> (FakeConnection, Value) {
		let mut connection = tokio::time::timeout(Duration::from_secs(5), self.connections.recv())
			.await
			.expect("timed out waiting for push connection")
			.expect("connector dropped");
		let subscribe = tokio::time::timeout(Duration::from_secs(5), connection.controller.next_sent())
			.await
			.expect("timed out waiting for subscribe")
			.expect("no subscribe message");
		(connection, subscribe)
	}
}
