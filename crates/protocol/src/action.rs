//! Action sequences (`POST /photo/action-sequence`).

use serde::{Deserialize, Serialize};

use crate::resource::ResourceKind;

pub const ACTION_SEQUENCE_PATH: &str = "/photo/action-sequence";

/// A single server-side operation inside an action sequence.
///
/// Serialized adjacently tagged:
/// ```json
/// { "action": "apply-filter", "config": { "filter_id": "f1", "output_count": 1, "input": [...] } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "config", rename_all = "kebab-case")]
pub enum Action {
	ApplyFilter(ApplyFilterConfig),
}

impl Action {
	/// Apply `filter_id` to the registered resource `resource_id`, requesting one output.
	pub fn apply_filter(resource_id: impl Into<String>, filter_id: impl Into<String>) -> Self {
		Self::ApplyFilter(ApplyFilterConfig {
			filter_id: filter_id.into(),
			output_count: 1,
			input: vec![ActionInput {
				id: resource_id.into(),
				kind: ResourceKind::InputImage,
			}],
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyFilterConfig {
	pub filter_id: String,
	pub output_count: u32,
	pub input: Vec<ActionInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInput {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: ResourceKind,
}

/// Element of the action-sequence response array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAction {
	pub action_id: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn apply_filter_wire_shape() {
		let body = vec![Action::apply_filter("r1", "f1")];
		assert_eq!(
			serde_json::to_value(&body).unwrap(),
			serde_json::json!([{
				"action": "apply-filter",
				"config": {
					"filter_id": "f1",
					"output_count": 1,
					"input": [{ "id": "r1", "type": "input_image" }]
				}
			}])
		);
	}
}
