//! Command result envelope.

use clap::ValueEnum;
use serde::Serialize;
use snapfilter::{Error, ProcessingError};

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON envelope
	Json,
}

/// The result envelope printed by every command in JSON mode.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	pub ok: bool,
	pub command: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

/// Stable error codes for scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	AuthError,
	UploadFailed,
	CatalogFailed,
	SubmissionFailed,
	ProcessingFailed,
	Timeout,
	InvalidInput,
	IoError,
	InternalError,
}

impl ErrorCode {
	/// Classifies a failure, looking through `anyhow` context for a core error.
	pub fn classify(err: &anyhow::Error) -> Self {
		let Some(core) = err.chain().find_map(|cause| cause.downcast_ref::<Error>()) else {
			return if err.chain().any(|cause| cause.is::<std::io::Error>()) {
				Self::IoError
			} else {
				Self::InternalError
			};
		};
		match core {
			Error::Auth(_) => Self::AuthError,
			Error::Upload(_) => Self::UploadFailed,
			Error::Catalog(_) => Self::CatalogFailed,
			Error::Submission(_) => Self::SubmissionFailed,
			Error::Processing(ProcessingError::Timeout(_)) => Self::Timeout,
			Error::Processing(_) => Self::ProcessingFailed,
			Error::Config(_) => Self::InvalidInput,
			Error::Store(_) | Error::Io(_) => Self::IoError,
			Error::Json(_) => Self::InternalError,
		}
	}
}

/// Prints a successful result. Text mode prints `text` instead of the data.
pub fn print_success<T: Serialize>(format: OutputFormat, command: &'static str, data: T, text: impl FnOnce(&T) -> String) {
	match format {
		OutputFormat::Text => println!("{}", text(&data)),
		OutputFormat::Json => print_json(&CommandResult {
			ok: true,
			command,
			data: Some(data),
			error: None,
		}),
	}
}

/// Prints a failure envelope on stdout. Text mode leaves reporting to the log.
pub fn print_failure(format: OutputFormat, command: &'static str, err: &anyhow::Error) {
	if format == OutputFormat::Json {
		print_json(&CommandResult::<()> {
			ok: false,
			command,
			data: None,
			error: Some(CommandError {
				code: ErrorCode::classify(err),
				message: format!("{err:#}"),
			}),
		});
	}
}

fn print_json<T: Serialize>(result: &CommandResult<T>) {
	match serde_json::to_string_pretty(result) {
		Ok(json) => println!("{json}"),
		Err(err) => eprintln!("failed to serialize result: {err}"),
	}
}
