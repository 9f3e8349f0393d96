use anyhow::{Context, Result};
use snapfilter::{Filter, Services, categories};
use tracing::info;

use crate::output::{OutputFormat, print_success};

pub async fn execute(services: &Services, category: Option<&str>, format: OutputFormat) -> Result<()> {
	let mut filters = services.catalog.list_filters().await.context("listing filters")?;
	if let Some(category) = category {
		filters.retain(|f| f.category.eq_ignore_ascii_case(category));
	}
	info!(target = "snapfilter.cli", count = filters.len(), "filters fetched");

	print_success(format, "filters", filters, |filters| render(filters));
	Ok(())
}

/// One section per category, in catalog order.
fn render(filters: &[Filter]) -> String {
	if filters.is_empty() {
		return "no filters available".to_string();
	}
	let mut out = String::new();
	for category in categories(filters) {
		if !out.is_empty() {
			out.push('\n');
		}
		out.push_str(&category);
		out.push('\n');
		for filter in filters.iter().filter(|f| f.category == category) {
			out.push_str(&format!("  {:<24} {}\n", filter.id, filter.thumbnail_url));
		}
	}
	out.trim_end().to_string()
}
