//! Filter catalog document (`GET /configs/home-filters`).

use serde::{Deserialize, Serialize};

pub const HOME_FILTERS_PATH: &str = "/configs/home-filters";

/// One block of the home configuration document.
///
/// Only `category` blocks describe filters; every other block type (banners,
/// carousels, ...) is accepted and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogBlock {
	Category {
		name: String,
		#[serde(default)]
		items: Vec<CatalogItem>,
	},
	#[serde(other)]
	Other,
}

/// Filter entry inside a category block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
	pub id: String,
	pub image_url: String,
}
