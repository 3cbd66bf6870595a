// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Assembles framed lines into [`StreamEvent`]s.
//!
//! The wire format is field based:
//!
//! ```text
//! : comment, ignored
//! id: 17
//! event: feature.updated
//! data: {"feature":"checkout.v2",
//! data:  "enabled":true}
//! retry: 5000
//!
//! ```
//!
//! A blank line ends the event. `retry` is a reconnection delay in
//! milliseconds and is reported separately from the event itself.

use std::time::Duration;

use tracing::trace;

use crate::event::StreamEvent;

/// What a single line did to the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
	/// The line updated the event under construction.
	Pending,
	/// Comment, malformed line, unknown field or unparseable `retry`.
	Ignored,
	/// The server asked for this reconnection delay.
	Retry(Duration),
	/// A blank line completed an event with a payload.
	Dispatch(StreamEvent),
	/// A blank line closed an event without a payload; nothing to deliver.
	Discarded,
}

/// Accumulates one in-progress event at a time.
#[derive(Debug, Default)]
pub struct EventAssembler {
	current: StreamEvent,
}

impl EventAssembler {
	pub fn new() -> Self {
		Self::default()
	}

	/// Processes one line with its terminator already stripped.
	pub fn feed(&mut self, line: &str) -> LineOutcome {
		if line.is_empty() {
			return self.boundary();
		}

		if line.starts_with(':') {
			return LineOutcome::Ignored;
		}

		let Some((field, value)) = line.split_once(':') else {
			trace!(line, "Ignoring event stream line without a field separator");
			return LineOutcome::Ignored;
		};
		let value = value.strip_prefix(' ').unwrap_or(value);

		match field {
			"id" => {
				self.current.id = value.to_string();
				LineOutcome::Pending
			}
			"event" => {
				self.current.kind = value.to_string();
				LineOutcome::Pending
			}
			"data" => {
				if !self.current.data.is_empty() {
					self.current.data.push('\n');
				}
				self.current.data.push_str(value);
				LineOutcome::Pending
			}
			"retry" => match value.parse::<u64>() {
				Ok(millis) => LineOutcome::Retry(Duration::from_millis(millis)),
				Err(_) => {
					trace!(value, "Ignoring unparseable retry field");
					LineOutcome::Ignored
				}
			},
			_ => LineOutcome::Ignored,
		}
	}

	/// Returns true if no field has been set since the last boundary.
	pub fn is_idle(&self) -> bool {
		self.current == StreamEvent::default()
	}

	/// Abandons the event under construction.
	pub fn reset(&mut self) {
		self.current = StreamEvent::default();
	}

	fn boundary(&mut self) -> LineOutcome {
		let event = std::mem::take(&mut self.current);
		if event.is_empty() {
			LineOutcome::Discarded
		} else {
			LineOutcome::Dispatch(event)
		}
	}
}
