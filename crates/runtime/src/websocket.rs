//! WebSocket transport built on tokio-tungstenite.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value as JsonValue;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::transport::{Connector, Transport, TransportParts, TransportReceiver};
use crate::{Result, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An established WebSocket connection, not yet split into transport parts.
pub struct WebSocketTransport {
	sink: SplitSink<WsStream, Message>,
	stream: SplitStream<WsStream>,
	message_tx: mpsc::UnboundedSender<JsonValue>,
}

impl WebSocketTransport {
	/// Performs the WebSocket handshake against `url`.
	pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<JsonValue>)> {
		let (ws, response) = connect_async(url).await.map_err(|e| TransportError::Connect(e.to_string()))?;
		debug!(target = "snapfilter.transport", status = %response.status(), "websocket connected");

		let (sink, stream) = ws.split();
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		Ok((Self { sink, stream, message_tx }, message_rx))
	}

	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<JsonValue>) -> TransportParts {
		TransportParts {
			sender: Box::new(WebSocketSender { sink: self.sink }),
			receiver: Box::new(WebSocketReceiver {
				stream: self.stream,
				message_tx: self.message_tx,
			}),
			message_rx,
		}
	}
}

struct WebSocketSender {
	sink: SplitSink<WsStream, Message>,
}

impl Transport for WebSocketSender {
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			let text = serde_json::to_string(&message)?;
			self.sink
				.send(Message::Text(text.into()))
				.await
				.map_err(|e| TransportError::Send(e.to_string()))
		})
	}

	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			match self.sink.close().await {
				Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
				Err(e) => Err(TransportError::Send(e.to_string())),
			}
		})
	}
}

struct WebSocketReceiver {
	stream: SplitStream<WsStream>,
	message_tx: mpsc::UnboundedSender<JsonValue>,
}

impl TransportReceiver for WebSocketReceiver {
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			while let Some(frame) = self.stream.next().await {
				let frame = frame.map_err(|e| TransportError::Receive(e.to_string()))?;
				let decoded = match frame {
					Message::Text(text) => serde_json::from_str::<JsonValue>(&text),
					Message::Binary(bytes) => serde_json::from_slice::<JsonValue>(&bytes),
					Message::Close(frame) => {
						debug!(target = "snapfilter.transport", ?frame, "peer closed websocket");
						return Ok(());
					}
					_ => continue,
				};

				let value = decoded.map_err(|e| TransportError::Decode(e.to_string()))?;
				if self.message_tx.send(value).is_err() {
					break;
				}
			}
			Ok(())
		})
	}
}

/// Connector opening a fresh WebSocket per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
	fn connect<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + 'a>> {
		Box::pin(async move {
			let (transport, message_rx) = WebSocketTransport::connect(url).await?;
			Ok(transport.into_transport_parts(message_rx))
		})
	}
}
