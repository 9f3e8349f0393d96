//! One open push channel: outbound sender plus a spawned reader task.

use serde_json::Value;
use snapfilter_runtime::{Transport, TransportError, TransportParts};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::ProcessingError;

pub(crate) struct PushChannel {
	sender: Box<dyn Transport>,
	messages: mpsc::UnboundedReceiver<Value>,
	reader: JoinHandle<snapfilter_runtime::Result<()>>,
}

impl PushChannel {
	pub(crate) fn open(parts: TransportParts) -> Self {
		let TransportParts {
			sender,
			receiver,
			message_rx,
		} = parts;
		Self {
			sender,
			messages: message_rx,
			reader: tokio::spawn(receiver.run()),
		}
	}

	pub(crate) async fn send(&mut self, message: Value) -> Result<(), ProcessingError> {
		self.sender.send(message).await.map_err(ProcessingError::from)
	}

	/// Next inbound message. Once the reader has stopped this reports why,
	/// and the channel must not be read again.
	pub(crate) async fn next(&mut self) -> Result<Value, ProcessingError> {
		if let Some(message) = self.messages.recv().await {
			return Ok(message);
		}
		match (&mut self.reader).await {
			Ok(Ok(())) => Err(ProcessingError::ChannelClosed),
			Ok(Err(err)) => Err(ProcessingError::Transport(err)),
			Err(join) => Err(ProcessingError::Transport(TransportError::Receive(join.to_string()))),
		}
	}

	pub(crate) async fn close(mut self) {
		if let Err(err) = self.sender.close().await {
			debug!(target = "snapfilter.listener", error = %err, "error while closing push channel");
		}
	}
}

impl Drop for PushChannel {
	fn drop(&mut self) {
		self.reader.abort();
	}
}
