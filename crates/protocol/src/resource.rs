//! Resource registration (`POST /photo/register-resource`).

use serde::{Deserialize, Serialize};

pub const REGISTER_RESOURCE_PATH: &str = "/photo/register-resource";

/// Name of the multipart part carrying the JSON manifest.
pub const MANIFEST_PART: &str = "config";

/// File name attached to the binary part.
pub const BINARY_PART_FILE_NAME: &str = "blob";

/// Role of a resource within an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
	InputImage,
}

/// One entry of the upload manifest, keyed by the binary part name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
	pub key: String,
	#[serde(rename = "type")]
	pub kind: ResourceKind,
}

impl ManifestEntry {
	/// Manifest entry describing `key` as the input image.
	pub fn input_image(key: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			kind: ResourceKind::InputImage,
		}
	}
}

/// Element of the registration response array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredResource {
	pub id: String,
}
