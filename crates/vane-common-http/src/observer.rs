// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Verbose request/response diagnostics with credentials masked.
//!
//! The observer only reads. It copies the metadata it is given, replaces the
//! values of credential-bearing headers with [`REDACTED`], and hands the
//! result to a [`DiagnosticSink`]. Nothing it does affects the request.

use std::fmt;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use tracing::debug;

/// The redaction placeholder used in all output.
pub const REDACTED: &str = "[REDACTED]";

/// Header names whose values are never passed to a sink, compared
/// case-insensitively.
pub const SENSITIVE_HEADERS: &[&str] = &[
	"authorization",
	"proxy-authorization",
	"cookie",
	"set-cookie",
	"x-api-key",
	"x-auth-token",
	"x-vane-client-secret",
];

/// Returns true if a header with this name carries a credential.
pub fn is_sensitive(name: &str) -> bool {
	SENSITIVE_HEADERS
		.iter()
		.any(|sensitive| sensitive.eq_ignore_ascii_case(name))
}

/// Copies headers into `(name, value)` pairs, masking sensitive values.
///
/// Non-UTF-8 values of non-sensitive headers are rendered lossily.
pub fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
	headers
		.iter()
		.map(|(name, value)| {
			let value = if is_sensitive(name.as_str()) {
				REDACTED.to_string()
			} else {
				String::from_utf8_lossy(value.as_bytes()).into_owned()
			};
			(name.as_str().to_string(), value)
		})
		.collect()
}

/// What is known about a message body at observation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
	Empty,
	Text(String),
	/// A body that is read incrementally and never buffered for logging.
	Streaming,
}

impl Body {
	/// Describes a fully read body. Non-UTF-8 bytes are rendered lossily.
	pub fn from_bytes(bytes: &[u8]) -> Self {
		if bytes.is_empty() {
			Body::Empty
		} else {
			Body::Text(String::from_utf8_lossy(bytes).into_owned())
		}
	}
}

impl fmt::Display for Body {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Body::Empty => f.write_str("<empty>"),
			Body::Text(text) => f.write_str(text),
			Body::Streaming => f.write_str("<streaming>"),
		}
	}
}

/// Redacted view of an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
	pub method: String,
	pub url: String,
	pub headers: Vec<(String, String)>,
	pub body: Body,
}

/// Redacted view of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
	pub status: u16,
	pub url: String,
	pub headers: Vec<(String, String)>,
	pub body: Body,
}

/// Receives redacted diagnostics.
pub trait DiagnosticSink: Send + Sync {
	fn request(&self, meta: &RequestMeta);
	fn response(&self, meta: &ResponseMeta);
}

/// Emits diagnostics as `debug` level tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
	fn request(&self, meta: &RequestMeta) {
		debug!(
			method = %meta.method,
			url = %meta.url,
			headers = ?meta.headers,
			body = %meta.body,
			"HTTP request"
		);
	}

	fn response(&self, meta: &ResponseMeta) {
		debug!(
			status = meta.status,
			url = %meta.url,
			headers = ?meta.headers,
			body = %meta.body,
			"HTTP response"
		);
	}
}

/// Masks credentials in request/response metadata before forwarding it.
#[derive(Clone)]
pub struct RedactingObserver {
	sink: Arc<dyn DiagnosticSink>,
}

impl RedactingObserver {
	pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
		Self { sink }
	}

	/// An observer that writes to `tracing`.
	pub fn tracing() -> Self {
		Self::new(Arc::new(TracingSink))
	}

	pub fn observe_request(&self, method: &Method, url: &Url, headers: &HeaderMap, body: Body) {
		self.sink.request(&RequestMeta {
			method: method.as_str().to_string(),
			url: url.to_string(),
			headers: redact_headers(headers),
			body,
		});
	}

	pub fn observe_response(&self, status: StatusCode, url: &Url, headers: &HeaderMap, body: Body) {
		self.sink.response(&ResponseMeta {
			status: status.as_u16(),
			url: url.to_string(),
			headers: redact_headers(headers),
			body,
		});
	}

	/// Observes a built request. In-memory bodies are logged as text;
	/// streamed bodies only as [`Body::Streaming`].
	pub fn request(&self, request: &reqwest::Request) {
		let body = match request.body() {
			None => Body::Empty,
			Some(body) => body.as_bytes().map_or(Body::Streaming, Body::from_bytes),
		};
		self.observe_request(request.method(), request.url(), request.headers(), body);
	}

	/// Observes response headers. The body is described by the caller since
	/// reading it would consume the response.
	pub fn response(&self, response: &reqwest::Response, body: Body) {
		self.observe_response(response.status(), response.url(), response.headers(), body);
	}
}

impl Default for RedactingObserver {
	fn default() -> Self {
		Self::tracing()
	}
}

impl fmt::Debug for RedactingObserver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RedactingObserver").finish_non_exhaustive()
	}
}
