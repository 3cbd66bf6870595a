// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Creates a new HTTP client builder with the standard Vane User-Agent header.
///
/// The User-Agent format is: `vane/{version}/{os}-{arch}`
/// Example: `vane/0.1.0/linux-x86_64`
///
/// Use this when you need to customize the client (e.g., set timeout).
///
/// # Example
/// ```ignore
/// let client = vane_common_http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a builder for clients that read long-lived response bodies.
///
/// Only the connect phase is bounded. A whole-request timeout would cut an
/// event stream off after a fixed time even while the server is still
/// sending.
pub fn streaming_builder(connect_timeout: Duration) -> ClientBuilder {
	builder().connect_timeout(connect_timeout)
}

/// Returns the standard Vane User-Agent string.
///
/// Format: `vane/{version}/{os}-{arch}`
pub fn user_agent() -> String {
	format!(
		"vane/{}/{}-{}",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		assert!(ua.starts_with("vane/"));
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 3);
		assert_eq!(parts[0], "vane");
		assert_eq!(parts[1], env!("CARGO_PKG_VERSION"));
		assert!(parts[2].contains('-'));
	}

	#[test]
	fn builder_builds() {
		assert!(builder().timeout(Duration::from_secs(30)).build().is_ok());
	}

	#[test]
	fn streaming_builder_builds() {
		let client = streaming_builder(Duration::from_secs(5)).build();
		assert!(client.is_ok());
	}
}
