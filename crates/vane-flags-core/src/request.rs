// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subscription parameters for a watch.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What a watch subscribes to.
///
/// Immutable for the lifetime of a watch; every reconnection sends the same
/// parameters. Empty or zero fields are left off the request entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchRequest {
	/// Project to watch.
	pub project: String,
	/// Identity of the evaluation subject.
	pub subject: String,
	/// Context path the subject is evaluated in.
	pub context: String,
	/// Target identifiers to narrow the stream to.
	#[serde(default)]
	pub targets: Vec<String>,
	/// Input for server-side evaluation scripts. Its presence switches the
	/// request from GET to POST.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payload: Option<serde_json::Value>,
	/// How often the server should re-evaluate and push state.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_interval: Option<Duration>,
	/// How often the server should send keepalive comments.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub keepalive_interval: Option<Duration>,
}

impl WatchRequest {
	pub fn new(project: impl Into<String>) -> Self {
		Self {
			project: project.into(),
			..Self::default()
		}
	}

	pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
		self.subject = subject.into();
		self
	}

	pub fn with_context(mut self, context: impl Into<String>) -> Self {
		self.context = context.into();
		self
	}

	pub fn with_targets<I, S>(mut self, targets: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.targets = targets.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
		self.payload = Some(payload);
		self
	}

	pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
		self.refresh_interval = Some(interval);
		self
	}

	pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
		self.keepalive_interval = Some(interval);
		self
	}

	/// Returns true if the request must be sent as a POST with a JSON body.
	pub fn has_payload(&self) -> bool {
		self.payload.is_some()
	}

	/// Query parameters in a stable order, omitting empty values.
	///
	/// Intervals are sent in whole seconds, rounded up so a sub-second
	/// interval is not silently turned into "disabled".
	pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
		let mut pairs = Vec::new();

		for (name, value) in [
			("project", &self.project),
			("subject", &self.subject),
			("context", &self.context),
		] {
			if !value.is_empty() {
				pairs.push((name, value.clone()));
			}
		}

		let targets: Vec<&str> = self
			.targets
			.iter()
			.map(String::as_str)
			.filter(|t| !t.is_empty())
			.collect();
		if !targets.is_empty() {
			pairs.push(("targets", targets.join(",")));
		}

		if let Some(secs) = self.refresh_interval.and_then(whole_seconds) {
			pairs.push(("refresh", secs.to_string()));
		}
		if let Some(secs) = self.keepalive_interval.and_then(whole_seconds) {
			pairs.push(("keepalive", secs.to_string()));
		}

		pairs
	}
}

fn whole_seconds(interval: Duration) -> Option<u64> {
	if interval.is_zero() {
		return None;
	}
	let secs = interval.as_secs();
	Some(if interval.subsec_nanos() > 0 { secs + 1 } else { secs })
}
