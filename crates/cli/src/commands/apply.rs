use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use snapfilter::{FilterOutcome, LoadOutcome, Services};
use tracing::{info, warn};

use crate::output::{OutputFormat, print_success};

pub struct ApplyOptions {
	pub photo: PathBuf,
	pub filter: String,
	pub output: Option<PathBuf>,
	pub mime: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyResult {
	resource_id: String,
	filter_id: String,
	result_url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	output: Option<PathBuf>,
}

pub async fn execute(services: &Services, options: ApplyOptions, format: OutputFormat) -> Result<()> {
	let bytes = tokio::fs::read(&options.photo)
		.await
		.with_context(|| format!("reading {}", options.photo.display()))?;
	let mime_type = options.mime.clone().unwrap_or_else(|| guess_mime(&options.photo).to_string());
	let file_name = options
		.photo
		.file_name()
		.and_then(|name| name.to_str())
		.unwrap_or("photo")
		.to_string();

	let edit = services.edit_session();
	let resource_id = match edit.load_photo(bytes, &mime_type, &file_name).await? {
		LoadOutcome::Ready(id) => id,
		LoadOutcome::Superseded => bail!("upload of {file_name} was interrupted"),
	};
	info!(target = "snapfilter.cli", resource_id = %resource_id, filter = %options.filter, "photo uploaded");

	let mut states = edit.subscribe();
	let progress = async {
		let mut last = None;
		while states.changed().await.is_ok() {
			let estimate = states.borrow_and_update().estimated_seconds;
			if estimate.is_some() && estimate != last {
				last = estimate;
				info!(target = "snapfilter.cli", estimated_seconds = estimate.unwrap_or_default(), "processing");
			}
		}
	};
	let outcome = tokio::select! {
		outcome = edit.apply_filter(&options.filter) => outcome?,
		_ = progress => bail!("edit session closed unexpectedly"),
	};
	let result_url = match outcome {
		FilterOutcome::Processed(url) => url,
		FilterOutcome::Superseded => bail!("filter {} was interrupted", options.filter),
		FilterOutcome::NoResource => bail!("no uploaded photo to apply {} to", options.filter),
	};

	if let Some(output) = &options.output {
		download(&result_url, output, services.config.request_timeout()).await?;
	}

	let result = ApplyResult {
		resource_id,
		filter_id: options.filter,
		result_url,
		output: options.output,
	};
	print_success(format, "apply", result, |result| match &result.output {
		Some(path) => format!("{} -> {}", result.result_url, path.display()),
		None => result.result_url.clone(),
	});
	Ok(())
}

async fn download(url: &str, output: &Path, timeout: std::time::Duration) -> Result<()> {
	let client = reqwest::Client::builder().timeout(timeout).build().context("creating download client")?;
	let response = client
		.get(url)
		.send()
		.await
		.and_then(reqwest::Response::error_for_status)
		.with_context(|| format!("downloading {url}"))?;
	let body = response.bytes().await.with_context(|| format!("downloading {url}"))?;

	if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
		tokio::fs::create_dir_all(parent)
			.await
			.with_context(|| format!("creating {}", parent.display()))?;
	}
	tokio::fs::write(output, &body)
		.await
		.with_context(|| format!("writing {}", output.display()))?;
	info!(target = "snapfilter.cli", path = %output.display(), bytes = body.len(), "result saved");
	Ok(())
}

fn guess_mime(path: &Path) -> &'static str {
	let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
	match extension.as_deref() {
		Some("jpg" | "jpeg") => "image/jpeg",
		Some("png") => "image/png",
		Some("webp") => "image/webp",
		Some("gif") => "image/gif",
		Some("heic") => "image/heic",
		Some("bmp") => "image/bmp",
		other => {
			warn!(target = "snapfilter.cli", extension = ?other, "unknown photo type, sending as octet-stream");
			"application/octet-stream"
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mime_is_guessed_from_the_extension() {
		assert_eq!(guess_mime(Path::new("cat.JPG")), "image/jpeg");
		assert_eq!(guess_mime(Path::new("/tmp/dog.png")), "image/png");
		assert_eq!(guess_mime(Path::new("scan")), "application/octet-stream");
	}
}
