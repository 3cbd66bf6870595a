// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The reconnecting event stream loop.
//!
//! A [`Watcher`] keeps one logical stream alive across any number of
//! connections. It resumes from the last delivered event id, backs off
//! between failed attempts, and honours a `retry:` hint from the server.
//! Only two things end a watch: the callback returning an error, or
//! cancellation.

use std::convert::Infallible;
use std::fmt;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vane_flags_core::{Backoff, Disconnect, StreamEvent};

use crate::config::WatchConfig;
use crate::error::{FlagsError, Result, WatchError};
use crate::session::{run_session, SessionOutcome};
use crate::transport::EventTransport;

/// Counters for one watcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
	/// Connections the server accepted.
	pub connects: u64,
	/// Connection attempts after the first.
	pub reconnects: u64,
	/// Events the callback accepted.
	pub events_delivered: u64,
	/// Attempts that ended in a transport failure.
	pub failures: u64,
}

/// Owns the cursor, backoff state and stats for one stream.
pub struct Watcher<T> {
	transport: T,
	config: WatchConfig,
	backoff: Backoff,
	cursor: String,
	stats: WatchStats,
}

impl<T: EventTransport> Watcher<T> {
	/// Validates `config` and creates a watcher that has not connected yet.
	pub fn new(transport: T, config: WatchConfig) -> Result<Self> {
		config.validate()?;
		let backoff =
			Backoff::new(config.backoff).map_err(|e| FlagsError::InvalidConfig(e.to_string()))?;
		Ok(Self::with_backoff(transport, config, backoff))
	}

	/// For callers holding a `Backoff` built from an already validated config.
	pub(crate) fn with_backoff(transport: T, config: WatchConfig, backoff: Backoff) -> Self {
		Self {
			transport,
			config,
			backoff,
			cursor: String::new(),
			stats: WatchStats::default(),
		}
	}

	/// Seeds the cursor so the first connection resumes after `id`.
	pub fn resume_from(mut self, id: impl Into<String>) -> Self {
		self.cursor = id.into();
		self
	}

	/// Id of the last event delivered, or the seeded id.
	pub fn last_event_id(&self) -> Option<&str> {
		(!self.cursor.is_empty()).then_some(self.cursor.as_str())
	}

	pub fn stats(&self) -> WatchStats {
		self.stats
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	/// Streams events into `on_event` until it fails or `cancel` fires.
	///
	/// Events are delivered in order and at least once: after a reconnect
	/// the server may replay events past the cursor. Transport failures are
	/// logged and retried, never returned.
	pub async fn run<F, E>(
		&mut self,
		cancel: &CancellationToken,
		mut on_event: F,
	) -> std::result::Result<Infallible, WatchError<E>>
	where
		F: FnMut(StreamEvent) -> std::result::Result<(), E>,
	{
		let mut attempt: u64 = 0;

		loop {
			if cancel.is_cancelled() {
				info!("Event stream watch cancelled");
				return Err(WatchError::Cancelled);
			}

			if attempt > 0 {
				self.stats.reconnects += 1;
			}
			attempt += 1;
			debug!(
				attempt,
				last_event_id = %self.cursor,
				"Connecting to event stream"
			);

			let report = run_session(
				&self.transport,
				&mut self.cursor,
				&self.config,
				cancel,
				&mut on_event,
			)
			.await;

			self.stats.events_delivered += report.delivered;
			if report.streamed {
				self.stats.connects += 1;
				self.backoff.reset();
			}

			let disconnect = match report.outcome {
				SessionOutcome::EndedClean => {
					debug!(delivered = report.delivered, "Event stream closed by server");
					Disconnect::Clean
				}
				SessionOutcome::Failed(e) => {
					self.stats.failures += 1;
					warn!(error = %e, delivered = report.delivered, "Event stream connection failed");
					Disconnect::Failed
				}
				SessionOutcome::CallbackStopped(e) => {
					debug!("Event callback failed, stopping watch");
					return Err(WatchError::Callback(e));
				}
				SessionOutcome::Cancelled => {
					info!("Event stream watch cancelled");
					return Err(WatchError::Cancelled);
				}
			};

			let delay = self.backoff.next_delay(disconnect, report.retry_hint);
			info!(
				delay_ms = delay.as_millis() as u64,
				server_hint = report.retry_hint.is_some(),
				"Reconnecting to event stream"
			);

			tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					info!("Event stream watch cancelled during reconnect wait");
					return Err(WatchError::Cancelled);
				}
				_ = tokio::time::sleep(delay) => {}
			}
		}
	}
}

impl<T> fmt::Debug for Watcher<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Watcher")
			.field("config", &self.config)
			.field("backoff", &self.backoff)
			.field("cursor", &self.cursor)
			.field("stats", &self.stats)
			.finish_non_exhaustive()
	}
}

/// How a background watch finished.
#[derive(Debug)]
pub enum WatchExit<E> {
	Cancelled,
	Callback(E),
	/// The watch task panicked or was aborted.
	Aborted,
}

/// A watch running on its own tokio task.
///
/// Dropping the handle cancels the watch.
pub struct WatchHandle<E> {
	cancel: CancellationToken,
	task: Option<JoinHandle<WatchError<E>>>,
}

impl<E: Send + 'static> WatchHandle<E> {
	/// Spawns `watcher.run(on_event)` onto the current runtime.
	pub fn spawn<T, F>(mut watcher: Watcher<T>, mut on_event: F) -> Self
	where
		T: EventTransport + 'static,
		F: FnMut(StreamEvent) -> std::result::Result<(), E> + Send + 'static,
	{
		let cancel = CancellationToken::new();
		let token = cancel.clone();
		let task = tokio::spawn(async move {
			match watcher.run(&token, &mut on_event).await {
				Ok(never) => match never {},
				Err(e) => e,
			}
		});

		Self {
			cancel,
			task: Some(task),
		}
	}

	/// Asks the watch to stop without waiting for it.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub fn is_finished(&self) -> bool {
		self.task.as_ref().map_or(true, JoinHandle::is_finished)
	}

	/// Waits for the watch to end on its own.
	pub async fn join(mut self) -> WatchExit<E> {
		let Some(task) = self.task.take() else {
			return WatchExit::Aborted;
		};
		match task.await {
			Ok(WatchError::Cancelled) => WatchExit::Cancelled,
			Ok(WatchError::Callback(e)) => WatchExit::Callback(e),
			Err(e) => {
				warn!(error = %e, "Watch task did not complete");
				WatchExit::Aborted
			}
		}
	}

	/// Cancels the watch and waits for it to end.
	pub async fn stop(self) -> WatchExit<E> {
		self.cancel();
		self.join().await
	}
}

impl<E> Drop for WatchHandle<E> {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

impl<E> fmt::Debug for WatchHandle<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WatchHandle")
			.field("cancelled", &self.cancel.is_cancelled())
			.finish_non_exhaustive()
	}
}
