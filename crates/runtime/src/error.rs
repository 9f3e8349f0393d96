use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

/// Failures of the push channel itself, independent of message meaning.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("failed to connect: {0}")]
	Connect(String),

	#[error("failed to send message: {0}")]
	Send(String),

	#[error("channel error: {0}")]
	Receive(String),

	#[error("undecodable frame: {0}")]
	Decode(String),

	#[error("channel closed")]
	Closed,

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl TransportError {
	/// Whether reconnecting could plausibly succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Connect(_) | Self::Send(_) | Self::Receive(_) | Self::Closed)
	}
}
