//! Uploader, catalog and job submission against the mock API.

mod common;

use axum::http::StatusCode;
use common::Harness;
use serde_json::json;
use snapfilter::{DuplicateFilterPolicy, Error, Filter, categories};

fn catalog_document() -> serde_json::Value {
	json!([
		{ "type": "banner", "title": "Autumn" },
		{ "type": "category", "name": "A", "items": [
			{ "id": "x", "image_url": "https://cdn/x.png" },
			{ "id": "y", "image_url": "https://cdn/y.png" }
		]},
		{ "type": "category", "name": "B", "items": [
			{ "id": "y", "image_url": "https://cdn/y.png" },
			{ "id": "z", "image_url": "https://cdn/z.png" }
		]}
	])
}

fn ids(filters: &[Filter]) -> Vec<(&str, &str)> {
	filters.iter().map(|f| (f.id.as_str(), f.category.as_str())).collect()
}

#[tokio::test]
async fn upload_returns_the_registered_id() {
	let harness = Harness::start().await;

	let id = harness.services.uploader.upload(vec![1, 2, 3], "image/png", "cat.png").await.unwrap();
	assert_eq!(id, "r1");

	let uploads = harness.mock.uploads.lock().clone();
	assert_eq!(uploads.len(), 1);
	let upload = &uploads[0];
	assert_eq!(upload.part_name, "cat.png");
	assert_eq!(upload.file_name.as_deref(), Some("blob"));
	assert_eq!(upload.content_type.as_deref(), Some("image/png"));
	assert_eq!(upload.bytes, vec![1, 2, 3]);
	assert_eq!(upload.manifest, json!([{ "key": "cat.png", "type": "input_image" }]));
	assert!(upload.token.is_some());
}

#[tokio::test]
async fn upload_without_id_is_an_upload_error() {
	let harness = Harness::start().await;

	for body in [json!([]), json!([{ "name": "cat.png" }]), json!({ "id": "r1" })] {
		*harness.mock.upload_response.lock() = (StatusCode::OK, body.clone());
		let err = harness.services.uploader.upload(vec![1], "image/png", "cat.png").await.unwrap_err();
		assert!(matches!(err, Error::Upload(_)), "{body}: {err}");
	}
}

#[tokio::test]
async fn upload_is_not_retried() {
	let harness = Harness::start().await;
	*harness.mock.upload_response.lock() = (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "boom" }));

	let err = harness.services.uploader.upload(vec![1], "image/png", "cat.png").await.unwrap_err();
	assert!(matches!(err, Error::Upload(_)));
	assert_eq!(harness.mock.uploads.lock().len(), 1);
}

#[tokio::test]
async fn catalog_keeps_first_occurrence_by_default() {
	let harness = Harness::start().await;
	*harness.mock.catalog_response.lock() = (StatusCode::OK, catalog_document());

	let filters = harness.services.catalog.list_filters().await.unwrap();
	assert_eq!(ids(&filters), vec![("x", "A"), ("y", "A"), ("z", "B")]);
	assert_eq!(filters[2].thumbnail_url, "https://cdn/z.png");
	assert_eq!(categories(&filters), vec!["A".to_string(), "B".to_string()]);
}

#[tokio::test]
async fn catalog_per_category_policy_lists_shared_filters_twice() {
	let store = std::sync::Arc::new(snapfilter::MemoryTokenStore::new());
	let harness = Harness::start_with(|config| config.duplicate_filters = DuplicateFilterPolicy::PerCategory, store).await;
	*harness.mock.catalog_response.lock() = (StatusCode::OK, catalog_document());

	let filters = harness.services.catalog.list_filters().await.unwrap();
	assert_eq!(ids(&filters), vec![("x", "A"), ("y", "A"), ("y", "B"), ("z", "B")]);
}

#[tokio::test]
async fn catalog_schema_violation_is_a_catalog_error() {
	let harness = Harness::start().await;
	*harness.mock.catalog_response.lock() = (StatusCode::OK, json!([{ "type": "category", "name": "A", "items": [{ "id": 7 }] }]));

	let err = harness.services.catalog.list_filters().await.unwrap_err();
	assert!(matches!(err, Error::Catalog(_)), "{err}");
}

#[tokio::test]
async fn submit_posts_an_apply_filter_action() {
	let harness = Harness::start().await;

	let action_id = harness.services.submitter.submit("r1", "f1").await.unwrap();
	assert_eq!(action_id, "a1");

	let submissions = harness.mock.submissions.lock().clone();
	assert_eq!(
		submissions,
		vec![json!([{
			"action": "apply-filter",
			"config": { "filter_id": "f1", "output_count": 1, "input": [{ "id": "r1", "type": "input_image" }] }
		}])]
	);
}

#[tokio::test]
async fn submit_without_action_id_is_a_submission_error() {
	let harness = Harness::start().await;
	*harness.mock.submit_response.lock() = Some((StatusCode::OK, json!([])));

	let err = harness.services.submitter.submit("r1", "f1").await.unwrap_err();
	assert!(matches!(err, Error::Submission(_)), "{err}");
}
