//! Fake transport for unit testing push channel consumers.
//!
//! Provides an in-memory channel so listeners can be driven without a server.
//!
//! # Example
//!
//! ```ignore
//! let (connector, mut connections) = FakeConnector::new();
//! let listener = ProcessingListener::new(Arc::new(connector), settings);
//!
//! let fut = listener.listen("a1", "token");
//! let mut conn = connections.recv().await.unwrap();
//! let subscribe = conn.controller.next_sent().await.unwrap();
//! conn.controller.inject_event("processing-resource-ready", json!({"url": "u1"}));
//! let url = fut.await?;
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::{Notify, mpsc};

use crate::transport::{Connector, Transport, TransportParts, TransportReceiver};
use crate::{Result, TransportError};

enum Inbound {
	Message(JsonValue),
	Fail(String),
	Close,
}

/// Builder for creating fake transport instances.
#[derive(Default)]
pub struct FakeTransportBuilder {}

impl FakeTransportBuilder {
	pub fn new() -> Self {
		Self {}
	}

	/// Build the fake transport and return both parts and a controller.
	///
	/// Returns [`TransportParts`] for the code under test and a
	/// [`FakeTransportController`] for injecting messages and inspecting sent ones.
	pub fn build(self) -> (TransportParts, FakeTransportController) {
		let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		let (sent_tx, sent_rx) = mpsc::unbounded_channel();
		let closed = Arc::new(AtomicBool::new(false));
		let close_notify = Arc::new(Notify::new());

		let sender = FakeTransportSender {
			sent_tx,
			closed: Arc::clone(&closed),
			close_notify: Arc::clone(&close_notify),
		};

		let receiver = FakeTransportReceiver {
			inbound_rx,
			message_tx,
			closed: Arc::clone(&closed),
			close_notify,
		};

		let controller = FakeTransportController { inbound_tx, sent_rx, closed };

		let parts = TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		};

		(parts, controller)
	}
}

/// Controller for injecting inbound traffic and inspecting sent messages.
pub struct FakeTransportController {
	inbound_tx: mpsc::UnboundedSender<Inbound>,
	sent_rx: mpsc::UnboundedReceiver<JsonValue>,
	closed: Arc<AtomicBool>,
}

impl FakeTransportController {
	/// Inject a raw JSON message as if the server sent it.
	///
	/// Returns `false` once the receiving side has stopped.
	pub fn inject(&self, message: JsonValue) -> bool {
		self.inbound_tx.send(Inbound::Message(message)).is_ok()
	}

	/// Inject a named push event, encoding `data` into a JSON string the way
	/// the service does.
	pub fn inject_event(&self, name: &str, data: JsonValue) -> bool {
		self.inject(serde_json::json!({
			"name": name,
			"data": data.to_string(),
		}))
	}

	/// Make the receiving side fail with a transport error.
	pub fn fail(&self, reason: &str) -> bool {
		self.inbound_tx.send(Inbound::Fail(reason.to_string())).is_ok()
	}

	/// Close the channel from the server side.
	pub fn close_from_server(&self) -> bool {
		self.inbound_tx.send(Inbound::Close).is_ok()
	}

	/// Wait for the next message the client sent.
	pub async fn next_sent(&mut self) -> Option<JsonValue> {
		self.sent_rx.recv().await
	}

	/// Whether the client closed its side of the channel.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}
}

struct FakeTransportSender {
	sent_tx: mpsc::UnboundedSender<JsonValue>,
	closed: Arc<AtomicBool>,
	close_notify: Arc<Notify>,
}

impl Transport for FakeTransportSender {
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			if self.closed.load(Ordering::SeqCst) {
				return Err(TransportError::Closed);
			}
			self.sent_tx.send(message).map_err(|_| TransportError::Closed)
		})
	}

	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			self.closed.store(true, Ordering::SeqCst);
			self.close_notify.notify_one();
			Ok(())
		})
	}
}

struct FakeTransportReceiver {
	inbound_rx: mpsc::UnboundedReceiver<Inbound>,
	message_tx: mpsc::UnboundedSender<JsonValue>,
	closed: Arc<AtomicBool>,
	close_notify: Arc<Notify>,
}

impl TransportReceiver for FakeTransportReceiver {
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			loop {
				if self.closed.load(Ordering::SeqCst) {
					return Ok(());
				}
				let inbound = tokio::select! {
					_ = self.close_notify.notified() => return Ok(()),
					inbound = self.inbound_rx.recv() => inbound,
				};
				match inbound {
					Some(Inbound::Message(message)) => {
						if self.message_tx.send(message).is_err() {
							return Ok(());
						}
					}
					Some(Inbound::Fail(reason)) => return Err(TransportError::Receive(reason)),
					Some(Inbound::Close) | None => return Ok(()),
				}
			}
		})
	}
}

/// A connection handed out by [`FakeConnector`].
pub struct FakeConnection {
	/// URL the client connected to, including query parameters.
	pub url: String,
	pub controller: FakeTransportController,
}

/// Connector producing in-memory channels.
///
/// Every successful `connect` publishes a [`FakeConnection`] on the receiver
/// returned from [`FakeConnector::new`].
pub struct FakeConnector {
	connections: mpsc::UnboundedSender<FakeConnection>,
	refusals: Mutex<VecDeque<String>>,
}

impl FakeConnector {
	pub fn new() -> (Self, mpsc::UnboundedReceiver<FakeConnection>) {
		let (connections, rx) = mpsc::unbounded_channel();
		(
			Self {
				connections,
				refusals: Mutex::new(VecDeque::new()),
			},
			rx,
		)
	}

	/// Make the next `connect` call fail with `reason`.
	pub fn refuse_next(&self, reason: &str) {
		self.refusals.lock().push_back(reason.to_string());
	}
}

impl Connector for FakeConnector {
	fn connect<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + 'a>> {
		Box::pin(async move {
			if let Some(reason) = self.refusals.lock().pop_front() {
				return Err(TransportError::Connect(reason));
			}
			let (parts, controller) = FakeTransportBuilder::new().build();
			self.connections
				.send(FakeConnection {
					url: url.to_string(),
					controller,
				})
				.map_err(|_| TransportError::Connect("fake connector dropped".into()))?;
			Ok(parts)
		})
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[tokio::test]
	async fn sent_messages_reach_the_controller() {
		let (mut parts, mut controller) = FakeTransportBuilder::new().build();

		parts.sender.send(json!({"name": "ping"})).await.unwrap();

		let sent = controller.next_sent().await.unwrap();
		assert_eq!(sent["name"], "ping");
	}

	#[tokio::test]
	async fn injected_messages_are_forwarded() {
		let (parts, controller) = FakeTransportBuilder::new().build();
		let mut rx = parts.message_rx;
		let task = tokio::spawn(parts.receiver.run());

		assert!(controller.inject_event("processing-estimate", json!({"estimated_seconds": 3})));

		let message = rx.recv().await.unwrap();
		assert_eq!(message["name"], "processing-estimate");
		assert_eq!(message["data"], "{\"estimated_seconds\":3}");

		controller.close_from_server();
		assert!(task.await.unwrap().is_ok());
	}

	#[tokio::test]
	async fn failure_ends_the_receiver_with_an_error() {
		let (parts, controller) = FakeTransportBuilder::new().build();
		let task = tokio::spawn(parts.receiver.run());

		controller.fail("connection reset");

		match task.await.unwrap() {
			Err(TransportError::Receive(reason)) => assert_eq!(reason, "connection reset"),
			other => panic!("expected receive error, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn closing_the_sender_stops_the_receiver() {
		let (mut parts, controller) = FakeTransportBuilder::new().build();
		let task = tokio::spawn(parts.receiver.run());

		parts.sender.close().await.unwrap();

		assert!(task.await.unwrap().is_ok());
		assert!(controller.is_closed());
		assert!(matches!(parts.sender.send(json!({})).await, Err(TransportError::Closed)));
	}

	#[tokio::test]
	async fn connector_publishes_connections_and_honours_refusals() {
		let (connector, mut connections) = FakeConnector::new();

		connector.refuse_next("dns failure");
		assert!(matches!(connector.connect("ws://push?key=t").await, Err(TransportError::Connect(_))));

		let _parts = connector.connect("ws://push?key=t").await.unwrap();
		let conn = connections.recv().await.unwrap();
		assert_eq!(conn.url, "ws://push?key=t");
	}
}
