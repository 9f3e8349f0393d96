//! Bounded exponential backoff.
//!
//! Only token issuance and push channel reconnects retry. Uploads and job
//! submissions have remote side effects and surface their first failure.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
	/// Total attempts including the first one. `0` is treated as `1`.
	pub attempts: u32,
	pub initial_delay_ms: u64,
	pub max_delay_ms: u64,
	pub multiplier: f64,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			attempts: 3,
			initial_delay_ms: 250,
			max_delay_ms: 4_000,
			multiplier: 2.0,
		}
	}
}

impl RetryPolicy {
	/// A policy that makes exactly one attempt.
	pub fn none() -> Self {
		Self {
			attempts: 1,
			..Self::default()
		}
	}

	pub fn max_attempts(&self) -> u32 {
		self.attempts.max(1)
	}

	/// Delay before retry number `retry` (1-based), capped at `max_delay_ms`.
	pub fn delay_for(&self, retry: u32) -> Duration {
		let exponent = retry.saturating_sub(1).min(31) as i32;
		let factor = self.multiplier.max(1.0).powi(exponent);
		let millis = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
		Duration::from_millis(millis as u64)
	}
}

/// Runs `op` until it succeeds, `should_retry` rejects the error, or attempts run out.
pub async fn retry_async<T, E, F, Fut>(policy: &RetryPolicy, label: &str, should_retry: impl Fn(&E) -> bool, mut op: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: std::fmt::Display,
{
	let max_attempts = policy.max_attempts();
	let mut attempt = 1;
	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(err) if attempt < max_attempts && should_retry(&err) => {
				let delay = policy.delay_for(attempt);
				warn!(
					target = "snapfilter.retry",
					operation = label,
					attempt,
					max_attempts,
					delay_ms = delay.as_millis() as u64,
					error = %err,
					"retrying after failure"
				);
				tokio::time::sleep(delay).await;
				attempt += 1;
			}
			Err(err) => return Err(err),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use super::*;

	fn fast(attempts: u32) -> RetryPolicy {
		RetryPolicy {
			attempts,
			initial_delay_ms: 1,
			max_delay_ms: 2,
			multiplier: 2.0,
		}
	}

	#[test]
	fn delays_grow_and_cap() {
		let policy = RetryPolicy {
			attempts: 5,
			initial_delay_ms: 100,
			max_delay_ms: 350,
			multiplier: 2.0,
		};
		assert_eq!(policy.delay_for(1), Duration::from_millis(100));
		assert_eq!(policy.delay_for(2), Duration::from_millis(200));
		assert_eq!(policy.delay_for(3), Duration::from_millis(350));
		assert_eq!(policy.delay_for(30), Duration::from_millis(350));
	}

	#[test]
	fn zero_attempts_still_runs_once() {
		assert_eq!(fast(0).max_attempts(), 1);
	}

	#[tokio::test]
	async fn retries_until_success() {
		let counter = AtomicU32::new(0);
		let calls = &counter;
		let result: Result<u32, String> = retry_async(&fast(3), "test", |_| true, move || async move {
			let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
			if n < 3 { Err(format!("attempt {n}")) } else { Ok(n) }
		})
		.await;
		assert_eq!(result.unwrap(), 3);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn stops_after_max_attempts() {
		let counter = AtomicU32::new(0);
		let calls = &counter;
		let result: Result<(), String> = retry_async(&fast(2), "test", |_| true, move || async move {
			calls.fetch_add(1, Ordering::SeqCst);
			Err("down".to_string())
		})
		.await;
		assert_eq!(result.unwrap_err(), "down");
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn non_retryable_errors_return_immediately() {
		let counter = AtomicU32::new(0);
		let calls = &counter;
		let result: Result<(), String> = retry_async(&fast(5), "test", |err: &String| err != "fatal", move || async move {
			calls.fetch_add(1, Ordering::SeqCst);
			Err("fatal".to_string())
		})
		.await;
		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
