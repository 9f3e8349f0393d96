//! Resource registration.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use snapfilter_protocol::{BINARY_PART_FILE_NAME, MANIFEST_PART, ManifestEntry, REGISTER_RESOURCE_PATH, RegisteredResource};
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::session::SessionManager;

/// Registers local images as remote resources.
///
/// Uploads are not retried: a failed attempt may still have registered the
/// resource server-side.
pub struct ResourceUploader {
	api: Arc<ApiClient>,
	session: Arc<SessionManager>,
}

impl ResourceUploader {
	pub fn new(api: Arc<ApiClient>, session: Arc<SessionManager>) -> Self {
		Self { api, session }
	}

	/// Uploads `bytes` and returns the id the service assigned to them.
	pub async fn upload(&self, bytes: impl Into<Bytes>, mime_type: &str, file_name: &str) -> Result<String> {
		let bytes = bytes.into();
		let token = self.session.ensure_valid_token().await?;
		let size = bytes.len();
		let form = build_form(bytes, mime_type, file_name)?;
		debug!(target = "snapfilter.upload", file_name, mime_type, size, "registering resource");

		let registered: Vec<RegisteredResource> = self
			.api
			.post_multipart(REGISTER_RESOURCE_PATH, &token, form)
			.await
			.map_err(|e| Error::Upload(e.to_string()))?;
		let resource = registered
			.into_iter()
			.next()
			.ok_or_else(|| Error::Upload("response contained no resource".into()))?;

		info!(target = "snapfilter.upload", resource_id = %resource.id, size, "resource registered");
		Ok(resource.id)
	}
}

fn build_form(bytes: Bytes, mime_type: &str, file_name: &str) -> Result<Form> {
	let length = bytes.len() as u64;
	let binary = Part::stream_with_length(bytes, length)
		.file_name(BINARY_PART_FILE_NAME)
		.mime_str(mime_type)
		.map_err(|e| Error::Upload(format!("invalid mime type {mime_type}: {e}")))?;
	let manifest = serde_json::to_string(&[ManifestEntry::input_image(file_name)])?;
	Ok(Form::new().part(file_name.to_string(), binary).text(MANIFEST_PART, manifest))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_unparseable_mime_type() {
		let err = build_form(Bytes::from_static(&[1, 2, 3]), "not a mime", "a.png").unwrap_err();
		assert!(matches!(err, Error::Upload(_)));
	}
}
