//! Error taxonomy for the orchestration core.

use snapfilter_runtime::TransportError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// Token issuance failed or returned an unusable token.
	#[error("authentication failed: {0}")]
	Auth(String),

	#[error("upload failed: {0}")]
	Upload(String),

	#[error("failed to fetch filters: {0}")]
	Catalog(String),

	#[error("failed to submit job: {0}")]
	Submission(String),

	#[error("processing failed: {0}")]
	Processing(#[from] ProcessingError),

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("token store error: {0}")]
	Store(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl Error {
	pub fn is_auth(&self) -> bool {
		matches!(self, Self::Auth(_))
	}

	/// Whether this error settled a listen that was displaced or cancelled on purpose.
	pub fn is_superseded(&self) -> bool {
		matches!(self, Self::Processing(ProcessingError::Superseded { .. } | ProcessingError::Cancelled))
	}
}

/// Failures while awaiting a job result over the push channel.
#[derive(Debug, Error)]
pub enum ProcessingError {
	/// A newer listen replaced this one before it settled.
	#[error("superseded by listen for action {by}")]
	Superseded { by: String },

	#[error("listen cancelled")]
	Cancelled,

	#[error("timed out {0}")]
	Timeout(&'static str),

	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The server closed the channel before the result arrived.
	#[error("push channel closed before the result was ready")]
	ChannelClosed,

	#[error("malformed push message: {0}")]
	MalformedMessage(String),
}

impl ProcessingError {
	/// Transient channel failures are worth a reconnect; everything else is final.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Transport(err) => err.is_transient(),
			Self::ChannelClosed => true,
			_ => false,
		}
	}
}
