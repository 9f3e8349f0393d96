//! Transport abstractions shared by the WebSocket and fake implementations.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value as JsonValue;
use tokio::sync::mpsc;

use crate::Result;

/// Outbound half of a message channel.
pub trait Transport: Send + Sync {
	/// Serializes and sends one message.
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

	/// Closes the channel. Closing an already closed channel is not an error.
	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Inbound half of a message channel.
///
/// `run` forwards every decoded message to the paired `message_rx` until the
/// peer closes (`Ok`) or the channel fails (`Err`).
pub trait TransportReceiver: Send {
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Both halves of an opened channel plus the inbound message queue.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<JsonValue>,
}

/// Opens channels.
pub trait Connector: Send + Sync {
	fn connect<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + 'a>>;
}
