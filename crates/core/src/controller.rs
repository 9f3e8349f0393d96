//! Edit session orchestration.
//!
//! [`EditSessionController`] is the only component presentation talks to. It
//! sequences upload, submission and listening, and publishes every transition
//! through a [`watch`] channel.
//!
//! Every operation starts a new epoch. A call only writes state while its epoch
//! is still current, so a displaced call (a filter switch mid-processing, a new
//! photo, a reset) settles as superseded without touching state. Epoch bumps
//! and guarded writes both happen under the watch channel's lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::jobs::{Job, JobStatus, JobSubmitter};
use crate::listener::ProcessingListener;
use crate::session::SessionManager;
use crate::uploader::ResourceUploader;

/// A photo held in memory for preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
	pub bytes: Bytes,
	pub mime_type: String,
	pub file_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
	#[default]
	Idle,
	Uploading,
	Ready,
	Processing,
	Processed,
	Failed,
}

/// Everything presentation needs to render an edit session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditState {
	pub original_image: Option<LocalImage>,
	/// URL of the filtered result.
	pub processed_image: Option<String>,
	pub active_filter_id: Option<String>,
	pub resource_id: Option<String>,
	pub job: Option<Job>,
	pub phase: Phase,
	pub error_message: Option<String>,
	/// Latest estimate reported while processing.
	pub estimated_seconds: Option<f64>,
}

impl EditState {
	pub fn is_loading(&self) -> bool {
		matches!(self.phase, Phase::Uploading | Phase::Processing)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
	/// The photo was registered under this resource id.
	Ready(String),
	/// A later operation replaced this load before it finished.
	Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
	/// The filter was applied; holds the result URL.
	Processed(String),
	/// A later operation replaced this request before it finished.
	Superseded,
	/// No photo has been uploaded yet.
	NoResource,
}

pub struct EditSessionController {
	session: Arc<SessionManager>,
	uploader: Arc<ResourceUploader>,
	submitter: Arc<JobSubmitter>,
	listener: Arc<ProcessingListener>,
	state: watch::Sender<EditState>,
	epoch: AtomicU64,
}

impl EditSessionController {
	pub fn new(
		session: Arc<SessionManager>,
		uploader: Arc<ResourceUploader>,
		submitter: Arc<JobSubmitter>,
		listener: Arc<ProcessingListener>,
	) -> Self {
		Self {
			session,
			uploader,
			submitter,
			listener,
			state: watch::Sender::new(EditState::default()),
			epoch: AtomicU64::new(0),
		}
	}

	pub fn subscribe(&self) -> watch::Receiver<EditState> {
		self.state.subscribe()
	}

	/// Snapshot of the current state.
	pub fn state(&self) -> EditState {
		self.state.borrow().clone()
	}

	/// Shows `bytes` immediately, then registers them as the session's resource.
	///
	/// Allowed from any phase. Anything in flight is abandoned.
	pub async fn load_photo(&self, bytes: impl Into<Bytes>, mime_type: &str, file_name: &str) -> Result<LoadOutcome> {
		let bytes = bytes.into();
		let image = LocalImage {
			bytes: bytes.clone(),
			mime_type: mime_type.to_string(),
			file_name: file_name.to_string(),
		};
		let epoch = self.begin(|state| {
			*state = EditState {
				original_image: Some(image),
				phase: Phase::Uploading,
				..EditState::default()
			};
		});
		info!(target = "snapfilter.controller", epoch, file_name, "photo loaded");

		match self.uploader.upload(bytes, mime_type, file_name).await {
			Ok(resource_id) => {
				let applied = self.update(epoch, |state| {
					state.resource_id = Some(resource_id.clone());
					state.phase = Phase::Ready;
				});
				Ok(if applied { LoadOutcome::Ready(resource_id) } else { LoadOutcome::Superseded })
			}
			Err(err) => self.fail(epoch, err).map(|()| LoadOutcome::Superseded),
		}
	}

	/// Applies `filter_id` to the uploaded photo and waits for the result.
	///
	/// Calling this while another filter is processing abandons the earlier
	/// job; the earlier call returns [`FilterOutcome::Superseded`].
	pub async fn apply_filter(&self, filter_id: &str) -> Result<FilterOutcome> {
		let mut resource_id = None;
		let epoch = self.begin_if(|state| {
			let Some(id) = state.resource_id.clone() else {
				return false;
			};
			resource_id = Some(id);
			state.processed_image = None;
			state.error_message = None;
			state.estimated_seconds = None;
			state.job = None;
			state.active_filter_id = Some(filter_id.to_string());
			state.phase = Phase::Processing;
			true
		});
		let (Some(epoch), Some(resource_id)) = (epoch, resource_id) else {
			debug!(target = "snapfilter.controller", filter_id, "no uploaded photo, ignoring filter");
			return Ok(FilterOutcome::NoResource);
		};
		info!(target = "snapfilter.controller", epoch, filter_id, resource_id = %resource_id, "applying filter");

		let action_id = match self.submitter.submit(&resource_id, filter_id).await {
			Ok(action_id) => action_id,
			Err(err) => return self.fail(epoch, err).map(|()| FilterOutcome::Superseded),
		};

		let token = match self.session.ensure_valid_token().await {
			Ok(token) => token,
			Err(err) => return self.fail(epoch, err).map(|()| FilterOutcome::Superseded),
		};

		// Registered under the state lock: a newer epoch either cancels this listen or prevents it.
		let mut job = Job::submitted(action_id.clone(), resource_id, filter_id.to_string());
		job.status = JobStatus::AwaitingResult;
		let mut pending = None;
		self.update(epoch, |state| {
			pending = Some(self.listener.register(&action_id));
			state.job = Some(job);
		});
		let Some(pending) = pending else {
			debug!(target = "snapfilter.controller", action_id = %action_id, "displaced before listening");
			return Ok(FilterOutcome::Superseded);
		};

		let result = pending
			.wait_with_progress(&token, |estimate| {
				self.update(epoch, |state| state.estimated_seconds = Some(estimate.estimated_seconds));
			})
			.await;

		match result {
			Ok(url) => {
				let applied = self.update(epoch, |state| {
					state.processed_image = Some(url.clone());
					state.phase = Phase::Processed;
					if let Some(job) = state.job.as_mut() {
						job.status = JobStatus::Completed { url: url.clone() };
					}
				});
				Ok(if applied { FilterOutcome::Processed(url) } else { FilterOutcome::Superseded })
			}
			Err(err) => self.fail(epoch, err).map(|()| FilterOutcome::Superseded),
		}
	}

	/// Returns to an empty session and abandons anything in flight.
	///
	/// The uploaded resource is left on the server.
	pub fn reset(&self) {
		self.begin(|state| *state = EditState::default());
		info!(target = "snapfilter.controller", "edit session reset");
	}

	/// Starts a new epoch, applying `start` and cancelling the live listen in
	/// the same critical section.
	fn begin(&self, start: impl FnOnce(&mut EditState)) -> u64 {
		let mut epoch = 0;
		self.state.send_modify(|state| {
			epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
			self.listener.cancel();
			start(state);
		});
		epoch
	}

	/// Starts a new epoch only if `start` accepts the current state.
	fn begin_if(&self, start: impl FnOnce(&mut EditState) -> bool) -> Option<u64> {
		let mut epoch = None;
		self.state.send_if_modified(|state| {
			if !start(state) {
				return false;
			}
			epoch = Some(self.epoch.fetch_add(1, Ordering::SeqCst) + 1);
			self.listener.cancel();
			true
		});
		epoch
	}

	/// Applies `write` if `epoch` is still current. Returns whether it was applied.
	fn update(&self, epoch: u64, write: impl FnOnce(&mut EditState)) -> bool {
		self.state.send_if_modified(|state| {
			if self.epoch.load(Ordering::SeqCst) != epoch {
				return false;
			}
			write(state);
			true
		})
	}

	/// Records `err` as the session failure. A displaced call swallows the
	/// error and returns `Ok`.
	fn fail(&self, epoch: u64, err: Error) -> Result<()> {
		let message = err.to_string();
		let applied = self.update(epoch, |state| {
			state.phase = Phase::Failed;
			state.error_message = Some(message.clone());
			state.estimated_seconds = None;
			if let Some(job) = state.job.as_mut() {
				job.status = JobStatus::Failed { reason: message.clone() };
			}
		});
		if !applied {
			debug!(target = "snapfilter.controller", epoch, error = %err, "discarding failure of displaced call");
			return Ok(());
		}
		warn!(target = "snapfilter.controller", epoch, error = %err, "edit session failed");
		Err(err)
	}
}
