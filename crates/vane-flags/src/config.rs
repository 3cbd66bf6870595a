// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client and watch configuration.

use std::time::Duration;

use tracing::trace;
use vane_common_http::RetryConfig;
use vane_flags_core::BackoffPolicy;

use crate::error::{FlagsError, Result};

pub const ENV_BASE_URL: &str = "VANE_BASE_URL";
pub const ENV_CLIENT_ID: &str = "VANE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "VANE_CLIENT_SECRET";
pub const ENV_TOKEN: &str = "VANE_TOKEN";
pub const ENV_VERBOSE: &str = "VANE_VERBOSE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "VANE_REQUEST_TIMEOUT_SECS";

/// Default path of the event stream endpoint, relative to the base URL.
pub const DEFAULT_STREAM_PATH: &str = "/v1/watch";

/// Configuration for a single watch.
#[derive(Debug, Clone, Default)]
pub struct WatchConfig {
	/// Reconnection delays.
	pub backoff: BackoffPolicy,
	/// Treat the connection as failed if no bytes arrive for this long.
	/// `None` waits forever; servers are expected to send keepalives.
	pub idle_timeout: Option<Duration>,
	/// Treat the connection as failed once an unterminated line buffers
	/// more than this many bytes. `None` buffers without limit.
	pub max_line_length: Option<usize>,
}

impl WatchConfig {
	pub fn validate(&self) -> Result<()> {
		self
			.backoff
			.validate()
			.map_err(|e| FlagsError::InvalidConfig(e.to_string()))?;
		if self.idle_timeout.is_some_and(|t| t.is_zero()) {
			return Err(FlagsError::InvalidConfig(
				"idle timeout must be > 0".to_string(),
			));
		}
		if self.max_line_length == Some(0) {
			return Err(FlagsError::InvalidConfig(
				"max line length must be > 0".to_string(),
			));
		}
		Ok(())
	}
}

/// Configuration for the flags client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// Timeout for ordinary request/response calls.
	pub request_timeout: Duration,
	/// Timeout for establishing any connection, including the event stream.
	pub connect_timeout: Duration,
	/// Path of the event stream endpoint.
	pub stream_path: String,
	/// Retry configuration for ordinary HTTP requests.
	pub retry_config: RetryConfig,
	/// Event stream behaviour.
	pub watch: WatchConfig,
	/// Log redacted request/response metadata.
	pub verbose: bool,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			request_timeout: Duration::from_secs(30),
			connect_timeout: Duration::from_secs(10),
			stream_path: DEFAULT_STREAM_PATH.to_string(),
			retry_config: RetryConfig::default(),
			watch: WatchConfig::default(),
			verbose: false,
		}
	}
}

impl ClientConfig {
	pub fn validate(&self) -> Result<()> {
		if self.request_timeout.is_zero() {
			return Err(FlagsError::InvalidConfig(
				"request timeout must be > 0".to_string(),
			));
		}
		if self.connect_timeout.is_zero() {
			return Err(FlagsError::InvalidConfig(
				"connect timeout must be > 0".to_string(),
			));
		}
		if self.retry_config.max_attempts == 0 {
			return Err(FlagsError::InvalidConfig(
				"retry max_attempts must be >= 1".to_string(),
			));
		}
		self.watch.validate()
	}
}

/// Settings found in the environment. Unset or blank variables are `None`.
#[derive(Debug, Default)]
pub(crate) struct EnvOverrides {
	pub base_url: Option<String>,
	pub client_id: Option<String>,
	pub client_secret: Option<String>,
	pub token: Option<String>,
	pub verbose: Option<bool>,
	pub request_timeout: Option<Duration>,
}

impl EnvOverrides {
	pub fn load() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
		let get = |key: &str| {
			let value = lookup(key)
				.map(|v| v.trim().to_string())
				.filter(|v| !v.is_empty());
			if value.is_some() {
				trace!(key, "Loaded setting from environment");
			}
			value
		};

		let verbose = get(ENV_VERBOSE)
			.map(|value| parse_bool(&value).ok_or_else(|| invalid(ENV_VERBOSE, "a boolean")))
			.transpose()?;

		let request_timeout = get(ENV_REQUEST_TIMEOUT_SECS)
			.map(|value| {
				value
					.parse::<u64>()
					.ok()
					.filter(|secs| *secs > 0)
					.map(Duration::from_secs)
					.ok_or_else(|| invalid(ENV_REQUEST_TIMEOUT_SECS, "a positive number of seconds"))
			})
			.transpose()?;

		Ok(Self {
			base_url: get(ENV_BASE_URL),
			client_id: get(ENV_CLIENT_ID),
			client_secret: get(ENV_CLIENT_SECRET),
			token: get(ENV_TOKEN),
			verbose,
			request_timeout,
		})
	}
}

fn invalid(key: &str, expected: &str) -> FlagsError {
	FlagsError::InvalidConfig(format!("{key} must be {expected}"))
}

fn parse_bool(value: &str) -> Option<bool> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" => Some(false),
		_ => None,
	}
}
