//! Push channel transports.
//!
//! The processing listener talks to the service over a long-lived message
//! channel. This crate separates the channel mechanics from the protocol:
//!
//! * [`Transport`] sends JSON messages and closes the channel
//! * [`TransportReceiver`] pumps inbound JSON messages into an mpsc channel
//! * [`Connector`] opens a new channel for a URL
//!
//! [`WebSocketConnector`] is the production implementation. [`FakeConnector`]
//! is an in-memory implementation for testing listeners without a server.

pub mod error;
pub mod fake_transport;
pub mod transport;
pub mod websocket;

pub use error::{Result, TransportError};
pub use fake_transport::{FakeConnection, FakeConnector, FakeTransportBuilder, FakeTransportController};
pub use transport::{Connector, Transport, TransportParts, TransportReceiver};
pub use websocket::{WebSocketConnector, WebSocketTransport};
