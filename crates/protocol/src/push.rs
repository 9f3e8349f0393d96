//! Processing push channel messages.
//!
//! Every message is an envelope tagged by `name`. Inbound payloads arrive as a
//! JSON document encoded into the `data` string:
//!
//! ```json
//! { "name": "processing-resource-ready", "data": "{\"url\":\"https://cdn/out.jpg\"}" }
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROCESSING_CONNECT: &str = "processing-connect";
pub const PROCESSING_ESTIMATE: &str = "processing-estimate";
pub const PROCESSING_RESOURCE_READY: &str = "processing-resource-ready";

/// Query parameter carrying the session token on connect.
pub const PUSH_KEY_PARAM: &str = "key";

/// Messages sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum ClientMessage {
	/// Subscribes the connection to one action's completion.
	ProcessingConnect {
		#[serde(rename = "api-auth-key")]
		api_auth_key: String,
		data: ConnectData,
	},
}

impl ClientMessage {
	pub fn processing_connect(token: impl Into<String>, action_id: impl Into<String>) -> Self {
		Self::ProcessingConnect {
			api_auth_key: token.into(),
			data: ConnectData { action_id: action_id.into() },
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectData {
	pub action_id: String,
}

/// Raw inbound envelope before payload decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEnvelope {
	pub name: String,
	#[serde(default)]
	pub data: Value,
}

/// Estimated remaining processing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingEstimate {
	pub estimated_seconds: f64,
}

/// Final result location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReady {
	pub url: String,
}

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
	Estimate(ProcessingEstimate),
	ResourceReady(ResourceReady),
	/// A message name this client does not handle.
	Other(String),
}

impl PushEnvelope {
	/// Parses an envelope from a raw JSON value.
	pub fn from_value(value: Value) -> serde_json::Result<Self> {
		serde_json::from_value(value)
	}

	/// Decodes the payload according to `name`.
	///
	/// Unknown names decode to [`ServerEvent::Other`] without looking at the
	/// payload. Known names with an undecodable payload are errors.
	pub fn decode(self) -> serde_json::Result<ServerEvent> {
		match self.name.as_str() {
			PROCESSING_ESTIMATE => decode_data(self.data).map(ServerEvent::Estimate),
			PROCESSING_RESOURCE_READY => decode_data(self.data).map(ServerEvent::ResourceReady),
			_ => Ok(ServerEvent::Other(self.name)),
		}
	}
}

/// `data` is usually a JSON-encoded string; an inline object is accepted too.
fn decode_data<T: DeserializeOwned>(data: Value) -> serde_json::Result<T> {
	match data {
		Value::String(encoded) => serde_json::from_str(&encoded),
		inline => serde_json::from_value(inline),
	}
}
