// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request authentication.
//!
//! Every outgoing request, including each event stream reconnection, passes
//! through an [`Authenticator`]. Acquiring credentials is the caller's
//! business; this module only attaches them.

use std::fmt;

use reqwest::header::AUTHORIZATION;
use reqwest::RequestBuilder;
use vane_common_http::REDACTED;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Header carrying the client identity.
pub const CLIENT_ID_HEADER: &str = "X-Vane-Client-Id";

/// Header carrying the client secret.
pub const CLIENT_SECRET_HEADER: &str = "X-Vane-Client-Secret";

/// Attaches credentials to a request.
pub trait Authenticator: Send + Sync + fmt::Debug {
	fn authenticate(&self, request: RequestBuilder) -> RequestBuilder;
}

/// A string that never appears in logs and is zeroed when dropped.
///
/// No `Deref`; call [`Secret::expose`] to read it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
	inner: String,
}

impl Secret {
	pub fn new(inner: impl Into<String>) -> Self {
		Self {
			inner: inner.into(),
		}
	}

	pub fn expose(&self) -> &str {
		&self.inner
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl fmt::Debug for Secret {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl fmt::Display for Secret {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for Secret {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for Secret {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

/// Client identity and secret sent as two fixed headers.
#[derive(Clone)]
pub struct Credentials {
	client_id: String,
	client_secret: Secret,
}

impl Credentials {
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<Secret>) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
		}
	}

	pub fn client_id(&self) -> &str {
		&self.client_id
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.finish()
	}
}

impl Authenticator for Credentials {
	fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
		request
			.header(CLIENT_ID_HEADER, &self.client_id)
			.header(CLIENT_SECRET_HEADER, self.client_secret.expose())
	}
}

/// `Authorization: Bearer <token>`.
#[derive(Clone, Debug)]
pub struct BearerToken {
	token: Secret,
}

impl BearerToken {
	pub fn new(token: impl Into<Secret>) -> Self {
		Self {
			token: token.into(),
		}
	}
}

impl Authenticator for BearerToken {
	fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
		request.header(AUTHORIZATION, format!("Bearer {}", self.token.expose()))
	}
}

/// Sends requests unauthenticated.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuth;

impl Authenticator for NoAuth {
	fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
		request
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn build(auth: &dyn Authenticator) -> reqwest::Request {
		let client = reqwest::Client::new();
		auth
			.authenticate(client.get("https://flags.example.com/v1/watch"))
			.build()
			.unwrap()
	}

	#[test]
	fn secret_is_redacted_in_debug_and_display() {
		let secret = Secret::new("hunter2");
		assert_eq!(format!("{secret:?}"), "Secret(\"[REDACTED]\")");
		assert_eq!(format!("{secret}"), "[REDACTED]");
		assert_eq!(secret.expose(), "hunter2");
	}

	#[test]
	fn credentials_debug_hides_secret() {
		let creds = Credentials::new("client-7", "hunter2");
		let debug = format!("{creds:?}");
		assert!(debug.contains("client-7"));
		assert!(!debug.contains("hunter2"));
	}

	#[test]
	fn credentials_set_both_headers() {
		let request = build(&Credentials::new("client-7", "hunter2"));
		assert_eq!(request.headers()[CLIENT_ID_HEADER], "client-7");
		assert_eq!(request.headers()[CLIENT_SECRET_HEADER], "hunter2");
	}

	#[test]
	fn bearer_token_sets_authorization() {
		let request = build(&BearerToken::new("tok"));
		assert_eq!(request.headers()[AUTHORIZATION], "Bearer tok");
	}

	#[test]
	fn no_auth_adds_nothing() {
		let request = build(&NoAuth);
		assert!(request.headers().is_empty());
	}
}
