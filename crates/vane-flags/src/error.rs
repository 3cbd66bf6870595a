// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the feature flags SDK.

use std::time::Duration;

use thiserror::Error;
use vane_common_http::RetryableError;

/// Result type alias for the flags SDK.
pub type Result<T> = std::result::Result<T, FlagsError>;

/// Errors from client construction and resource calls.
#[derive(Error, Debug)]
pub enum FlagsError {
	/// Base URL is missing or invalid.
	#[error("Invalid or missing base URL: {0}")]
	InvalidBaseUrl(String),

	/// No authenticator was configured.
	#[error("No credentials configured")]
	MissingCredentials,

	/// A configuration value is out of range or unparseable.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[source] reqwest::Error),

	/// Failed to encode a request body.
	#[error("Failed to encode request body: {0}")]
	EncodeFailed(#[source] serde_json::Error),

	/// Failed to parse server response.
	#[error("Failed to parse server response: {0}")]
	ParseFailed(String),

	/// Credentials were rejected.
	#[error("Authentication failed with status {status}")]
	AuthenticationFailed {
		/// HTTP status code, 401 or 403.
		status: u16,
	},

	/// The resource does not exist.
	#[error("Not found: {url}")]
	NotFound {
		/// The URL that was requested.
		url: String,
	},

	/// Rate limited.
	#[error("Rate limited. Retry after {retry_after_secs:?} seconds")]
	RateLimited {
		/// Seconds until retry is allowed.
		retry_after_secs: Option<u64>,
	},

	/// Server returned an error response.
	#[error("Server returned an error: {status} - {message}")]
	ServerError {
		/// HTTP status code.
		status: u16,
		/// Error message from server.
		message: String,
	},
}

impl FlagsError {
	/// Returns true if the fixed-count retry should try the call again.
	///
	/// Only transport failures and 5xx responses qualify.
	pub fn is_retryable(&self) -> bool {
		match self {
			FlagsError::RequestFailed(err) => err.is_retryable(),
			FlagsError::ServerError { status, .. } => (500..=599).contains(status),
			_ => false,
		}
	}
}

impl RetryableError for FlagsError {
	fn is_retryable(&self) -> bool {
		FlagsError::is_retryable(self)
	}
}

/// Why a single event stream connection failed.
///
/// These never reach the caller of a watch. The reconnection loop logs them
/// and backs off.
#[derive(Error, Debug)]
pub enum TransportError {
	/// The connection could not be established.
	#[error("Failed to connect to event stream: {0}")]
	Connect(String),

	/// The server answered with a non-success status.
	#[error("Event stream rejected with status {status}")]
	ServerRejected {
		/// HTTP status code.
		status: u16,
	},

	/// Reading the response body failed.
	#[error("Event stream read failed: {0}")]
	StreamRead(#[source] std::io::Error),

	/// No bytes arrived within the idle timeout.
	#[error("Event stream idle for {0:?}")]
	Idle(Duration),

	/// An unterminated line grew past the configured limit.
	#[error("Event stream line exceeds {limit} bytes")]
	LineTooLong {
		/// Configured maximum line length.
		limit: usize,
	},

	/// The request could not be built.
	#[error("Invalid event stream request: {0}")]
	InvalidRequest(String),
}

/// How a watch ended. Transport problems are retried internally, so these
/// are the only outcomes a caller sees.
#[derive(Error, Debug)]
pub enum WatchError<E> {
	/// The event callback returned an error.
	#[error("Event callback failed: {0}")]
	Callback(E),

	/// The watch was cancelled.
	#[error("Watch cancelled")]
	Cancelled,
}

impl<E> WatchError<E> {
	pub fn is_cancelled(&self) -> bool {
		matches!(self, WatchError::Cancelled)
	}

	/// Returns the callback's error, if that is what ended the watch.
	pub fn into_callback(self) -> Option<E> {
		match self {
			WatchError::Callback(err) => Some(err),
			WatchError::Cancelled => None,
		}
	}
}
