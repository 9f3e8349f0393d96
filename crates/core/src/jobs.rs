//! Filter job submission.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snapfilter_protocol::{ACTION_SEQUENCE_PATH, Action, SubmittedAction};
use tracing::info;

use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::session::SessionManager;

/// One remote filter application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
	pub action_id: String,
	pub resource_id: String,
	pub filter_id: String,
	pub status: JobStatus,
}

impl Job {
	pub fn submitted(action_id: String, resource_id: String, filter_id: String) -> Self {
		Self {
			action_id,
			resource_id,
			filter_id,
			status: JobStatus::Submitted,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
	Submitted,
	AwaitingResult,
	Completed { url: String },
	Failed { reason: String },
}

impl JobStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Completed { .. } | Self::Failed { .. })
	}
}

pub struct JobSubmitter {
	api: Arc<ApiClient>,
	session: Arc<SessionManager>,
}

impl JobSubmitter {
	pub fn new(api: Arc<ApiClient>, session: Arc<SessionManager>) -> Self {
		Self { api, session }
	}

	/// Starts applying `filter_id` to `resource_id` and returns the action id.
	///
	/// Never retried; a lost response may still have started the job.
	pub async fn submit(&self, resource_id: &str, filter_id: &str) -> Result<String> {
		let token = self.session.ensure_valid_token().await?;
		let body = [Action::apply_filter(resource_id, filter_id)];

		let submitted: Vec<SubmittedAction> = self
			.api
			.post_json(ACTION_SEQUENCE_PATH, Some(&token), &body)
			.await
			.map_err(|e| Error::Submission(e.to_string()))?;
		let action = submitted
			.into_iter()
			.next()
			.ok_or_else(|| Error::Submission("response contained no action".into()))?;

		info!(target = "snapfilter.jobs", action_id = %action.action_id, resource_id, filter_id, "job submitted");
		Ok(action.action_id)
	}
}
