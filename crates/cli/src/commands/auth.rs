use anyhow::{Context, Result};
use serde::Serialize;
use snapfilter::Services;
use snapfilter::session::now_ts;

use crate::output::{OutputFormat, print_success};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatus {
	present: bool,
	valid: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	expiry: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	expires_in_secs: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	token_preview: Option<String>,
}

pub async fn status(services: &Services, format: OutputFormat) -> Result<()> {
	let leeway = services.config.token_leeway();
	let now = now_ts();
	let status = match services.session.current_session().await {
		Some(session) => SessionStatus {
			present: true,
			valid: session.is_valid_at(now, leeway),
			expiry: Some(session.expiry),
			expires_in_secs: Some(session.expiry.saturating_sub(now)),
			token_preview: Some(session.token.chars().take(12).collect::<String>() + "..."),
		},
		None => SessionStatus {
			present: false,
			valid: false,
			expiry: None,
			expires_in_secs: None,
			token_preview: None,
		},
	};

	print_success(format, "auth.status", status, |status| match (status.present, status.valid) {
		(false, _) => "no stored session".to_string(),
		(true, true) => format!("session valid for {}s", status.expires_in_secs.unwrap_or_default()),
		(true, false) => "stored session has expired".to_string(),
	});
	Ok(())
}

pub async fn clear(services: &Services, format: OutputFormat) -> Result<()> {
	let removed = services.session.clear().await.context("clearing session")?;
	print_success(format, "auth.clear", serde_json::json!({ "removed": removed }), |_| {
		if removed { "session cleared" } else { "no stored session" }.to_string()
	});
	Ok(())
}
