// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reconnection backoff for the event stream.
//!
//! Abnormal disconnects double the wait up to a ceiling. A clean server
//! close waits a short fixed delay. A `retry:` hint from the server replaces
//! the computed wait for one reconnection only.

use std::time::Duration;

use thiserror::Error;

/// Why a [`BackoffPolicy`] was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicyError {
	#[error("minimum reconnect delay must be > 0")]
	ZeroMinDelay,

	#[error("maximum reconnect delay ({max:?}) must be >= minimum reconnect delay ({min:?})")]
	MaxBelowMin { min: Duration, max: Duration },

	#[error("clean disconnect delay must be > 0")]
	ZeroCleanDisconnectDelay,
}

/// Backoff limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
	/// First wait after an abnormal disconnect, and the value restored once
	/// a connection is accepted.
	pub min_delay: Duration,
	/// Ceiling for the doubling.
	pub max_delay: Duration,
	/// Wait after the server closes the stream without an error.
	pub clean_disconnect_delay: Duration,
}

impl Default for BackoffPolicy {
	fn default() -> Self {
		Self {
			min_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(60),
			clean_disconnect_delay: Duration::from_secs(2),
		}
	}
}

impl BackoffPolicy {
	/// Rejects policies that would busy-loop or never grow.
	pub fn validate(&self) -> Result<(), BackoffPolicyError> {
		if self.min_delay.is_zero() {
			return Err(BackoffPolicyError::ZeroMinDelay);
		}
		if self.max_delay < self.min_delay {
			return Err(BackoffPolicyError::MaxBelowMin {
				min: self.min_delay,
				max: self.max_delay,
			});
		}
		if self.clean_disconnect_delay.is_zero() {
			return Err(BackoffPolicyError::ZeroCleanDisconnectDelay);
		}
		Ok(())
	}
}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
	/// The server closed the stream without an I/O error.
	Clean,
	/// Connect failure, rejection, read error or stall.
	Failed,
}

/// Mutable backoff state owned by a single watch.
///
/// Invariant: `policy.min_delay <= current <= policy.max_delay`.
#[derive(Debug, Clone)]
pub struct Backoff {
	policy: BackoffPolicy,
	current: Duration,
}

impl Backoff {
	/// Starts at `policy.min_delay`. Invalid policies are rejected.
	pub fn new(policy: BackoffPolicy) -> Result<Self, BackoffPolicyError> {
		policy.validate()?;
		Ok(Self {
			policy,
			current: policy.min_delay,
		})
	}

	pub fn policy(&self) -> &BackoffPolicy {
		&self.policy
	}

	/// The wait the next abnormal disconnect would produce.
	pub fn current(&self) -> Duration {
		self.current
	}

	/// Forgets accumulated penalty. Called once a connection is accepted.
	pub fn reset(&mut self) {
		self.current = self.policy.min_delay;
	}

	/// Returns how long to wait before reconnecting and advances the state.
	///
	/// `hint` is the server's `retry:` value from the session that just
	/// ended. It wins over the computed delay but is not remembered.
	pub fn next_delay(&mut self, disconnect: Disconnect, hint: Option<Duration>) -> Duration {
		let computed = match disconnect {
			Disconnect::Clean => {
				self.reset();
				self.policy.clean_disconnect_delay
			}
			Disconnect::Failed => {
				let delay = self.current;
				self.current = self
					.current
					.saturating_mul(2)
					.min(self.policy.max_delay)
					.max(self.policy.min_delay);
				delay
			}
		};
		hint.unwrap_or(computed)
	}
}
