//! Push channel listener for job completion.
//!
//! A listen runs `Connecting -> Subscribed -> AwaitingResult` and settles
//! exactly once. Only one listen is live per listener: starting a new one
//! interrupts the previous listen, waits until its channel is closed, and only
//! then connects.

mod channel;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use snapfilter_protocol::{ClientMessage, PUSH_KEY_PARAM, ProcessingEstimate, PushEnvelope, ServerEvent};
use snapfilter_runtime::Connector;
use tokio::sync::oneshot;
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tracing::{debug, info, warn};
use url::Url;

use self::channel::PushChannel;
use crate::config::ClientConfig;
use crate::error::{Error, ProcessingError, Result};
use crate::retry::RetryPolicy;

type ProcessingResult<T> = std::result::Result<T, ProcessingError>;
type ProgressFn<'a> = &'a (dyn Fn(&ProcessingEstimate) + Send + Sync);

/// Connection settings for the push channel.
#[derive(Debug, Clone)]
pub struct ListenerSettings {
	pub push_url: Url,
	pub connect_timeout: Duration,
	/// Bound on the whole listen, reconnects included.
	pub processing_timeout: Duration,
	pub retry: RetryPolicy,
}

impl ListenerSettings {
	pub fn from_config(config: &ClientConfig) -> Result<Self> {
		let push_url = Url::parse(&config.push_url).map_err(|e| Error::Config(format!("pushUrl is not a valid URL: {e}")))?;
		Ok(Self {
			push_url,
			connect_timeout: config.connect_timeout(),
			processing_timeout: config.processing_timeout(),
			retry: config.channel_retry.clone(),
		})
	}

	fn subscribe_url(&self, token: &str) -> String {
		let mut url = self.push_url.clone();
		url.query_pairs_mut().append_pair(PUSH_KEY_PARAM, token);
		url.into()
	}
}

#[derive(Debug)]
enum Interrupt {
	Superseded { by: String },
	Cancelled,
}

/// Bookkeeping for the listen currently holding the channel.
struct ActiveListen {
	generation: u64,
	action_id: String,
	interrupt_tx: Option<oneshot::Sender<Interrupt>>,
	closed_rx: oneshot::Receiver<()>,
}

pub struct ProcessingListener {
	connector: Arc<dyn Connector>,
	settings: ListenerSettings,
	active: Mutex<Option<ActiveListen>>,
	generation: AtomicU64,
}

impl ProcessingListener {
	pub fn new(connector: Arc<dyn Connector>, settings: ListenerSettings) -> Self {
		Self {
			connector,
			settings,
			active: Mutex::new(None),
			generation: AtomicU64::new(0),
		}
	}

	/// Waits for `action_id` to finish and returns the result URL.
	pub async fn listen(&self, action_id: &str, token: &str) -> Result<String> {
		self.register(action_id).wait(token).await
	}

	/// Like [`listen`](Self::listen), reporting every processing estimate to `on_progress`.
	pub async fn listen_with_progress<F>(&self, action_id: &str, token: &str, on_progress: F) -> Result<String>
	where
		F: Fn(&ProcessingEstimate) + Send + Sync,
	{
		self.register(action_id).wait_with_progress(token, on_progress).await
	}

	/// Claims the channel for `action_id` without suspending.
	///
	/// The previous listen is interrupted immediately, and from here on
	/// [`cancel`](Self::cancel) reaches the new one even before it is awaited.
	/// Dropping the returned [`PendingListen`] releases the claim.
	pub fn register(&self, action_id: &str) -> PendingListen<'_> {
		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		let (interrupt_tx, interrupt_rx) = oneshot::channel();
		let (closed_tx, closed_rx) = oneshot::channel();

		let previous = self.active.lock().replace(ActiveListen {
			generation,
			action_id: action_id.to_string(),
			interrupt_tx: Some(interrupt_tx),
			closed_rx,
		});
		let previous = previous.map(|mut previous| {
			if let Some(tx) = previous.interrupt_tx.take() {
				info!(
					target = "snapfilter.listener",
					action_id = %previous.action_id,
					superseded_by = action_id,
					"superseding previous listen"
				);
				let _ = tx.send(Interrupt::Superseded { by: action_id.to_string() });
			}
			previous.closed_rx
		});

		PendingListen {
			guard: ListenGuard {
				listener: self,
				generation,
				closed_tx: Some(closed_tx),
			},
			action_id: action_id.to_string(),
			interrupt_rx,
			previous_closed: previous,
		}
	}

	/// Settles the live listen, if any, with [`ProcessingError::Cancelled`].
	///
	/// Returns whether a listen was interrupted.
	pub fn cancel(&self) -> bool {
		let mut active = self.active.lock();
		let Some(listen) = active.as_mut() else {
			return false;
		};
		match listen.interrupt_tx.take() {
			Some(tx) => {
				info!(target = "snapfilter.listener", action_id = %listen.action_id, "cancelling listen");
				tx.send(Interrupt::Cancelled).is_ok()
			}
			None => false,
		}
	}

	/// Whether a listen currently holds the channel.
	pub fn is_listening(&self) -> bool {
		self.active.lock().is_some()
	}

	async fn run(
		&self,
		action_id: &str,
		token: &str,
		progress: Option<ProgressFn<'_>>,
		interrupt_rx: &mut oneshot::Receiver<Interrupt>,
	) -> ProcessingResult<String> {
		let deadline = Instant::now() + self.settings.processing_timeout;
		let url = self.settings.subscribe_url(token);
		let max_attempts = self.settings.retry.max_attempts();
		let mut attempt = 1;

		loop {
			match self.attempt(&url, action_id, token, progress, interrupt_rx, deadline).await {
				Ok(result) => return Ok(result),
				Err(err) if err.is_transient() && attempt < max_attempts => {
					let delay = self.settings.retry.delay_for(attempt);
					warn!(
						target = "snapfilter.listener",
						action_id,
						attempt,
						max_attempts,
						delay_ms = delay.as_millis() as u64,
						error = %err,
						"push channel failed, reconnecting"
					);
					tokio::select! {
						biased;
						interrupt = &mut *interrupt_rx => return Err(interrupted(interrupt)),
						_ = sleep_until(deadline) => return Err(ProcessingError::Timeout("waiting for result")),
						_ = sleep(delay) => {}
					}
					attempt += 1;
				}
				Err(err) => return Err(err),
			}
		}
	}

	/// One connection: connect, subscribe, wait. The channel is closed on every exit.
	async fn attempt(
		&self,
		url: &str,
		action_id: &str,
		token: &str,
		progress: Option<ProgressFn<'_>>,
		interrupt_rx: &mut oneshot::Receiver<Interrupt>,
		deadline: Instant,
	) -> ProcessingResult<String> {
		debug!(target = "snapfilter.listener", action_id, "connecting");
		let connect = timeout(self.settings.connect_timeout, self.connector.connect(url));
		let parts = tokio::select! {
			biased;
			interrupt = &mut *interrupt_rx => return Err(interrupted(interrupt)),
			_ = sleep_until(deadline) => return Err(ProcessingError::Timeout("waiting for result")),
			connected = connect => connected.map_err(|_| ProcessingError::Timeout("connecting to the push channel"))??,
		};

		let mut channel = PushChannel::open(parts);
		let outcome = await_result(&mut channel, action_id, token, progress, interrupt_rx, deadline).await;
		channel.close().await;
		outcome
	}
}

/// A listen that holds the channel but has not connected yet.
pub struct PendingListen<'a> {
	guard: ListenGuard<'a>,
	action_id: String,
	interrupt_rx: oneshot::Receiver<Interrupt>,
	previous_closed: Option<oneshot::Receiver<()>>,
}

impl PendingListen<'_> {
	/// Connects once the previous listen has closed its channel and waits for the result URL.
	pub async fn wait(self, token: &str) -> Result<String> {
		self.run(token, None).await
	}

	pub async fn wait_with_progress<F>(self, token: &str, on_progress: F) -> Result<String>
	where
		F: Fn(&ProcessingEstimate) + Send + Sync,
	{
		self.run(token, Some(&on_progress as ProgressFn<'_>)).await
	}

	async fn run(mut self, token: &str, progress: Option<ProgressFn<'_>>) -> Result<String> {
		if let Some(previous_closed) = self.previous_closed.take() {
			let _ = previous_closed.await;
		}
		if let Ok(interrupt) = self.interrupt_rx.try_recv() {
			return Err(interrupted(Ok(interrupt)).into());
		}

		let listener = self.guard.listener;
		let action_id = self.action_id.as_str();
		let result = listener.run(action_id, token, progress, &mut self.interrupt_rx).await;
		match &result {
			Ok(url) => info!(target = "snapfilter.listener", action_id, url = %url, "result ready"),
			Err(err) => debug!(target = "snapfilter.listener", action_id, error = %err, "listen settled with error"),
		}
		result.map_err(Error::from)
	}
}

async fn await_result(
	channel: &mut PushChannel,
	action_id: &str,
	token: &str,
	progress: Option<ProgressFn<'_>>,
	interrupt_rx: &mut oneshot::Receiver<Interrupt>,
	deadline: Instant,
) -> ProcessingResult<String> {
	let subscribe = serde_json::to_value(ClientMessage::processing_connect(token, action_id))
		.map_err(|e| ProcessingError::MalformedMessage(e.to_string()))?;
	channel.send(subscribe).await?;
	debug!(target = "snapfilter.listener", action_id, "subscribed");

	loop {
		let message = tokio::select! {
			biased;
			interrupt = &mut *interrupt_rx => return Err(interrupted(interrupt)),
			_ = sleep_until(deadline) => return Err(ProcessingError::Timeout("waiting for result")),
			message = channel.next() => message?,
		};

		let event = PushEnvelope::from_value(message)
			.and_then(PushEnvelope::decode)
			.map_err(|e| ProcessingError::MalformedMessage(e.to_string()))?;
		match event {
			ServerEvent::Estimate(estimate) => {
				debug!(target = "snapfilter.listener", action_id, estimated_seconds = estimate.estimated_seconds, "estimate received");
				if let Some(on_progress) = progress {
					on_progress(&estimate);
				}
			}
			ServerEvent::ResourceReady(ready) => return Ok(ready.url),
			ServerEvent::Other(name) => debug!(target = "snapfilter.listener", action_id, message_name = %name, "ignoring push message"),
		}
	}
}

fn interrupted(received: std::result::Result<Interrupt, oneshot::error::RecvError>) -> ProcessingError {
	match received {
		Ok(Interrupt::Superseded { by }) => ProcessingError::Superseded { by },
		Ok(Interrupt::Cancelled) | Err(_) => ProcessingError::Cancelled,
	}
}

/// Releases the active slot and acknowledges closure, however the listen ends.
struct ListenGuard<'a> {
	listener: &'a ProcessingListener,
	generation: u64,
	closed_tx: Option<oneshot::Sender<()>>,
}

impl Drop for ListenGuard<'_> {
	fn drop(&mut self) {
		{
			let mut active = self.listener.active.lock();
			if active.as_ref().is_some_and(|listen| listen.generation == self.generation) {
				*active = None;
			}
		}
		if let Some(tx) = self.closed_tx.take() {
			let _ = tx.send(());
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn subscribe_url_carries_the_token() {
		let settings = ListenerSettings::from_config(&ClientConfig {
			push_url: "wss://push.example.com/ws".into(),
			..ClientConfig::default()
		})
		.unwrap();
		assert_eq!(settings.subscribe_url("a.b c"), "wss://push.example.com/ws?key=a.b+c");
	}

	#[tokio::test]
	async fn interrupts_map_to_processing_errors() {
		assert!(matches!(interrupted(Ok(Interrupt::Cancelled)), ProcessingError::Cancelled));
		assert!(matches!(
			interrupted(Ok(Interrupt::Superseded { by: "a2".into() })),
			ProcessingError::Superseded { by } if by == "a2"
		));

		let (tx, rx) = oneshot::channel::<Interrupt>();
		drop(tx);
		let dropped = rx.await.unwrap_err();
		assert!(matches!(interrupted(Err(dropped)), ProcessingError::Cancelled));
	}
}
