//! Configuration layering and service construction for commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use snapfilter::{ClientConfig, Services};
use tracing::debug;

use crate::cli::Cli;

/// Token store location when neither the flag nor the config file names one.
pub fn default_token_store() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("snapfilter").join("session.json"))
}

/// Effective configuration: defaults, then `--config`, then environment and flags.
pub fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
	let mut config = match &cli.config {
		Some(path) => ClientConfig::load(path).with_context(|| format!("loading configuration from {}", path.display()))?,
		None => ClientConfig::default(),
	};

	if let Some(api_base) = &cli.api_base {
		config.api_base_url = api_base.clone();
	}
	if let Some(push_url) = &cli.push_url {
		config.push_url = push_url.clone();
	}
	if let Some(path) = &cli.token_store {
		config.token_store = Some(path.clone());
	}
	if config.token_store.is_none() {
		config.token_store = default_token_store();
	}

	config.validate().context("invalid configuration")?;
	debug!(
		target = "snapfilter.cli",
		api = %config.api_base_url,
		push = %config.push_url,
		token_store = ?config.token_store,
		"configuration resolved"
	);
	Ok(config)
}

pub fn build_services(cli: &Cli) -> Result<Services> {
	let config = resolve_config(cli)?;
	Ok(Services::from_config(config)?)
}

#[cfg(test)]
mod tests {
	use clap::Parser;
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn flags_override_the_config_file() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("snapfilter.json");
		std::fs::write(&path, r#"{ "apiBaseUrl": "http://file.example/api/v1", "processingTimeoutMs": 1000 }"#).unwrap();
		let store = temp.path().join("session.json");

		let cli = Cli::try_parse_from([
			"snapfilter",
			"--config",
			path.to_str().unwrap(),
			"--push-url",
			"ws://flag.example/ws",
			"--token-store",
			store.to_str().unwrap(),
			"auth",
			"status",
		])
		.unwrap();
		let config = resolve_config(&cli).unwrap();

		assert_eq!(config.api_base_url, "http://file.example/api/v1");
		assert_eq!(config.push_url, "ws://flag.example/ws");
		assert_eq!(config.processing_timeout_ms, 1000);
		assert_eq!(config.token_store, Some(store));
	}

	#[test]
	fn invalid_override_is_rejected() {
		let cli = Cli::try_parse_from(["snapfilter", "--push-url", "http://not-a-socket", "auth", "status"]).unwrap();
		let err = resolve_config(&cli).unwrap_err();
		assert!(format!("{err:#}").contains("pushUrl"));
	}
}
