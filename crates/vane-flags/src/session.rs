// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One connection lifetime: open, stream, deliver, end.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use vane_flags_core::{EventAssembler, LineFramer, LineOutcome, StreamEvent};

use crate::config::WatchConfig;
use crate::error::TransportError;
use crate::transport::{ByteStream, EventTransport};

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome<E> {
	/// The server closed the stream.
	EndedClean,
	/// Connect failure, rejection, read error or stall.
	Failed(TransportError),
	/// The callback returned an error; the connection was abandoned.
	CallbackStopped(E),
	/// The cancellation token fired.
	Cancelled,
}

/// Summary of one session, consumed by the reconnection loop.
#[derive(Debug)]
pub struct SessionReport<E> {
	/// Last `retry:` value the server sent during this session.
	pub retry_hint: Option<Duration>,
	/// True once the server accepted the request.
	pub streamed: bool,
	/// Events the callback accepted.
	pub delivered: u64,
	pub outcome: SessionOutcome<E>,
}

impl<E> SessionReport<E> {
	fn new(outcome: SessionOutcome<E>) -> Self {
		Self {
			retry_hint: None,
			streamed: false,
			delivered: 0,
			outcome,
		}
	}
}

/// Runs a single connection to completion.
///
/// `cursor` is the id of the last delivered event, empty if none. It is
/// sent for resumption and advanced after every event the callback accepts
/// that carries an id. Events in flight when the connection ends are
/// dropped; the server replays them on the next connection.
///
/// `config.max_line_length` bounds only the unterminated tail left after
/// each chunk's complete lines have been processed.
pub async fn run_session<T, F, E>(
	transport: &T,
	cursor: &mut String,
	config: &WatchConfig,
	cancel: &CancellationToken,
	on_event: &mut F,
) -> SessionReport<E>
where
	T: EventTransport + ?Sized,
	F: FnMut(StreamEvent) -> Result<(), E>,
{
	let resume_from = (!cursor.is_empty()).then_some(cursor.as_str());
	let opened = tokio::select! {
		biased;
		_ = cancel.cancelled() => return SessionReport::new(SessionOutcome::Cancelled),
		opened = transport.open(resume_from) => opened,
	};

	let mut stream = match opened {
		Ok(stream) => stream,
		Err(e) => return SessionReport::new(SessionOutcome::Failed(e)),
	};

	let mut report = SessionReport::new(SessionOutcome::EndedClean);
	report.streamed = true;
	debug!("Event stream connected");

	let mut framer = LineFramer::new();
	let mut assembler = EventAssembler::new();

	loop {
		let chunk = tokio::select! {
			biased;
			_ = cancel.cancelled() => {
				report.outcome = SessionOutcome::Cancelled;
				return report;
			}
			chunk = next_chunk(&mut stream, config.idle_timeout) => chunk,
		};

		let chunk = match chunk {
			Ok(Some(chunk)) => chunk,
			Ok(None) => {
				let dropped = framer.finish();
				if dropped > 0 {
					trace!(bytes = dropped, "Discarding unterminated line at end of stream");
				}
				if !assembler.is_idle() {
					trace!("Discarding incomplete event at end of stream");
				}
				return report;
			}
			Err(e) => {
				report.outcome = SessionOutcome::Failed(e);
				return report;
			}
		};

		framer.push(&chunk);
		while let Some(line) = framer.next_line() {
			match assembler.feed(&line) {
				LineOutcome::Retry(delay) => {
					trace!(delay_ms = delay.as_millis() as u64, "Server set reconnection delay");
					report.retry_hint = Some(delay);
				}
				LineOutcome::Dispatch(event) => {
					let id = event.id.clone();
					if let Err(e) = on_event(event) {
						report.outcome = SessionOutcome::CallbackStopped(e);
						return report;
					}
					report.delivered += 1;
					if !id.is_empty() {
						*cursor = id;
					}
				}
				LineOutcome::Pending | LineOutcome::Ignored | LineOutcome::Discarded => {}
			}
		}

		if let Some(limit) = config.max_line_length {
			if framer.pending_bytes() > limit {
				report.outcome = SessionOutcome::Failed(TransportError::LineTooLong { limit });
				return report;
			}
		}
	}
}

async fn next_chunk(
	stream: &mut ByteStream,
	idle_timeout: Option<Duration>,
) -> Result<Option<Bytes>, TransportError> {
	let next = match idle_timeout {
		Some(limit) => tokio::time::timeout(limit, stream.next())
			.await
			.map_err(|_| TransportError::Idle(limit))?,
		None => stream.next().await,
	};
	next.transpose().map_err(TransportError::StreamRead)
}
