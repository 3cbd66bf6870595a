// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The unit of data pushed by the server over the event stream.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Event type reported when the server did not send an `event:` field.
pub const DEFAULT_EVENT_KIND: &str = "message";

/// A fully assembled event from the stream.
///
/// Only events with a non-empty `data` payload are ever delivered to
/// callers; see [`EventAssembler`](crate::EventAssembler).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
	/// Server-assigned identifier, empty if the server sent none.
	pub id: String,
	/// Event type label, empty for the default type.
	pub kind: String,
	/// Payload; multiple `data:` lines are joined with `\n`.
	pub data: String,
}

impl StreamEvent {
	/// Creates an event with the given payload and no id or kind.
	pub fn new(data: impl Into<String>) -> Self {
		Self {
			data: data.into(),
			..Self::default()
		}
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = id.into();
		self
	}

	pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
		self.kind = kind.into();
		self
	}

	/// Returns true if there is no payload. Such events are never delivered.
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Returns the event kind, substituting `message` when none was sent.
	pub fn kind_or_default(&self) -> &str {
		if self.kind.is_empty() {
			DEFAULT_EVENT_KIND
		} else {
			&self.kind
		}
	}

	/// Decodes the payload as JSON.
	pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
		serde_json::from_str(&self.data)
	}
}
