//! Filter catalog.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snapfilter_protocol::{CatalogBlock, HOME_FILTERS_PATH};
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::session::SessionManager;

/// A filter a photo can be processed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
	pub id: String,
	pub thumbnail_url: String,
	pub category: String,
}

/// How filters listed under more than one category are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicateFilterPolicy {
	/// Keep only the first occurrence of each id across the whole catalog.
	#[default]
	FirstOccurrence,
	/// Keep one entry per category the filter appears in.
	PerCategory,
}

/// Flattens catalog blocks into filters, in document order.
pub fn flatten_catalog(blocks: Vec<CatalogBlock>, policy: DuplicateFilterPolicy) -> Vec<Filter> {
	let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
	let mut filters = Vec::new();

	for block in blocks {
		let CatalogBlock::Category { name, items } = block else {
			continue;
		};
		for item in items {
			let key = match policy {
				DuplicateFilterPolicy::FirstOccurrence => (item.id.clone(), None),
				DuplicateFilterPolicy::PerCategory => (item.id.clone(), Some(name.clone())),
			};
			if !seen.insert(key) {
				continue;
			}
			filters.push(Filter {
				id: item.id,
				thumbnail_url: item.image_url,
				category: name.clone(),
			});
		}
	}
	filters
}

/// Distinct category names in first-seen order.
pub fn categories(filters: &[Filter]) -> Vec<String> {
	let mut seen = HashSet::new();
	filters
		.iter()
		.filter(|f| seen.insert(f.category.as_str()))
		.map(|f| f.category.clone())
		.collect()
}

pub struct CatalogClient {
	api: Arc<ApiClient>,
	session: Arc<SessionManager>,
	policy: DuplicateFilterPolicy,
}

impl CatalogClient {
	pub fn new(api: Arc<ApiClient>, session: Arc<SessionManager>, policy: DuplicateFilterPolicy) -> Self {
		Self { api, session, policy }
	}

	/// Fetches the catalog and returns its filters.
	pub async fn list_filters(&self) -> Result<Vec<Filter>> {
		let token = self.session.ensure_valid_token().await?;
		let blocks: Vec<CatalogBlock> = self
			.api
			.get_json(HOME_FILTERS_PATH, &token)
			.await
			.map_err(|e| Error::Catalog(e.to_string()))?;
		debug!(target = "snapfilter.catalog", blocks = blocks.len(), "catalog fetched");

		let filters = flatten_catalog(blocks, self.policy);
		info!(target = "snapfilter.catalog", count = filters.len(), policy = ?self.policy, "filters listed");
		Ok(filters)
	}
}
