// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixed-count retry for ordinary request/response calls.
//!
//! A bounded number of attempts with a constant, optionally jittered, pause.
//! Long-lived event streams use their own reconnection backoff instead.

use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Total attempts including the first one.
	pub max_attempts: u32,
	/// Pause between attempts.
	pub delay: Duration,
	/// Scale each pause by a random factor in `[0.5, 1.5)`.
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			delay: Duration::from_millis(500),
			jitter: true,
		}
	}
}

impl RetryConfig {
	/// A config that makes exactly one attempt.
	pub fn none() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}

		self.status().is_some_and(|status| status.is_server_error())
	}
}

fn calculate_delay(cfg: &RetryConfig) -> Duration {
	if cfg.jitter {
		cfg.delay.mul_f64(0.5 + fastrand::f64())
	} else {
		cfg.delay
	}
}

pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Debug,
{
	let mut attempt = 0;

	loop {
		match f().await {
			Ok(result) => return Ok(result),
			Err(err) => {
				attempt += 1;

				if !err.is_retryable() {
					return Err(err);
				}

				if attempt >= cfg.max_attempts {
					warn!(
						error = ?err,
						attempt = attempt,
						max_attempts = cfg.max_attempts,
						"max retry attempts exhausted"
					);
					return Err(err);
				}

				let delay = calculate_delay(cfg);
				warn!(
					error = ?err,
					attempt = attempt,
					max_attempts = cfg.max_attempts,
					delay_ms = delay.as_millis() as u64,
					"retrying after error"
				);

				tokio::time::sleep(delay).await;
			}
		}
	}
}
