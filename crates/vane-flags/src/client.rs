// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feature flags client for the Vane service.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vane_common_http::{retry, Body, RedactingObserver, RetryConfig};
use vane_flags_core::{Backoff, BackoffPolicy, StreamEvent, WatchRequest};

use crate::auth::{Authenticator, BearerToken, Credentials, NoAuth};
use crate::config::{ClientConfig, EnvOverrides, WatchConfig};
use crate::error::{FlagsError, Result, WatchError};
use crate::transport::HttpTransport;
use crate::watcher::{WatchHandle, Watcher};

/// Builder for constructing a FlagsClient.
pub struct FlagsClientBuilder {
	base_url: Option<String>,
	authenticator: Option<Arc<dyn Authenticator>>,
	config: ClientConfig,
	observer: Option<RedactingObserver>,
}

impl FlagsClientBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			base_url: None,
			authenticator: None,
			config: ClientConfig::default(),
			observer: None,
		}
	}

	/// Creates a builder preloaded from `VANE_*` environment variables.
	///
	/// `VANE_CLIENT_ID`/`VANE_CLIENT_SECRET` take precedence over
	/// `VANE_TOKEN`. Anything set afterwards on the builder wins.
	pub fn from_env() -> Result<Self> {
		Ok(Self::new().with_env(EnvOverrides::load()?))
	}

	pub(crate) fn with_env(mut self, env: EnvOverrides) -> Self {
		if let Some(url) = env.base_url {
			self.base_url = Some(url);
		}
		match (env.client_id, env.client_secret, env.token) {
			(Some(id), Some(secret), _) => {
				self.authenticator = Some(Arc::new(Credentials::new(id, secret)));
			}
			(_, _, Some(token)) => {
				self.authenticator = Some(Arc::new(BearerToken::new(token)));
			}
			_ => {}
		}
		if let Some(verbose) = env.verbose {
			self.config.verbose = verbose;
		}
		if let Some(timeout) = env.request_timeout {
			self.config.request_timeout = timeout;
		}
		self
	}

	/// Sets the base URL for the Vane service.
	///
	/// Example: `https://flags.example.com`
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());
		self
	}

	/// Authenticates with a client id and secret.
	pub fn credentials(self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		self.authenticator(Credentials::new(client_id.into(), client_secret.into()))
	}

	/// Authenticates with a bearer token.
	pub fn bearer_token(self, token: impl Into<String>) -> Self {
		self.authenticator(BearerToken::new(token.into()))
	}

	/// Sends requests without credentials.
	pub fn anonymous(self) -> Self {
		self.authenticator(NoAuth)
	}

	/// Uses a custom authenticator.
	pub fn authenticator<A: Authenticator + 'static>(mut self, authenticator: A) -> Self {
		self.authenticator = Some(Arc::new(authenticator));
		self
	}

	/// Sets the request timeout for ordinary calls. The event stream is not
	/// subject to it.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = timeout;
		self
	}

	/// Sets the connect timeout for all connections.
	pub fn connect_timeout(mut self, timeout: Duration) -> Self {
		self.config.connect_timeout = timeout;
		self
	}

	/// Sets the event stream endpoint path.
	pub fn stream_path(mut self, path: impl Into<String>) -> Self {
		self.config.stream_path = path.into();
		self
	}

	/// Sets the retry configuration.
	pub fn retry_config(mut self, config: RetryConfig) -> Self {
		self.config.retry_config = config;
		self
	}

	/// Sets the watch configuration.
	pub fn watch_config(mut self, config: WatchConfig) -> Self {
		self.config.watch = config;
		self
	}

	/// Sets the reconnection backoff for watches.
	pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
		self.config.watch.backoff = policy;
		self
	}

	/// Fails a watch connection that receives nothing for `timeout`.
	pub fn idle_timeout(mut self, timeout: Duration) -> Self {
		self.config.watch.idle_timeout = Some(timeout);
		self
	}

	/// Fails a watch connection whose unterminated line exceeds `bytes`.
	pub fn max_line_length(mut self, bytes: usize) -> Self {
		self.config.watch.max_line_length = Some(bytes);
		self
	}

	/// Logs redacted request/response metadata through `tracing`.
	pub fn verbose(mut self, verbose: bool) -> Self {
		self.config.verbose = verbose;
		self
	}

	/// Sends redacted diagnostics to a custom observer. Implies verbose.
	pub fn observer(mut self, observer: RedactingObserver) -> Self {
		self.config.verbose = true;
		self.observer = Some(observer);
		self
	}

	/// Validates the configuration and builds the client.
	pub fn build(self) -> Result<FlagsClient> {
		let base_url = self
			.base_url
			.ok_or_else(|| FlagsError::InvalidBaseUrl("not set".to_string()))?;
		let base_url = parse_base_url(&base_url)?;
		let auth = self.authenticator.ok_or(FlagsError::MissingCredentials)?;
		self.config.validate()?;
		let backoff = Backoff::new(self.config.watch.backoff)
			.map_err(|e| FlagsError::InvalidConfig(e.to_string()))?;

		let stream_url = join_url(&base_url, &self.config.stream_path)?;

		let http = vane_common_http::builder()
			.timeout(self.config.request_timeout)
			.connect_timeout(self.config.connect_timeout)
			.build()
			.map_err(FlagsError::RequestFailed)?;
		let stream_http = vane_common_http::streaming_builder(self.config.connect_timeout)
			.build()
			.map_err(FlagsError::RequestFailed)?;

		let observer = match (self.observer, self.config.verbose) {
			(Some(observer), _) => Some(observer),
			(None, true) => Some(RedactingObserver::tracing()),
			(None, false) => None,
		};

		info!(base_url = %base_url, "Flags client configured");

		Ok(FlagsClient {
			inner: Arc::new(ClientInner {
				base_url,
				stream_url,
				http,
				stream_http,
				auth,
				backoff,
				config: self.config,
				observer,
			}),
		})
	}
}

impl Default for FlagsClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for FlagsClientBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FlagsClientBuilder")
			.field("base_url", &self.base_url)
			.field("authenticator", &self.authenticator)
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

fn parse_base_url(raw: &str) -> Result<String> {
	let trimmed = raw.trim().trim_end_matches('/');
	let url = Url::parse(trimmed).map_err(|e| FlagsError::InvalidBaseUrl(format!("{raw}: {e}")))?;
	if !matches!(url.scheme(), "http" | "https") {
		return Err(FlagsError::InvalidBaseUrl(format!(
			"{raw}: scheme must be http or https"
		)));
	}
	Ok(trimmed.to_string())
}

fn join_url(base: &str, path: &str) -> Result<Url> {
	let joined = format!("{}/{}", base, path.trim_start_matches('/'));
	Url::parse(&joined).map_err(|e| FlagsError::InvalidBaseUrl(format!("{joined}: {e}")))
}

struct ClientInner {
	base_url: String,
	stream_url: Url,
	http: Client,
	stream_http: Client,
	auth: Arc<dyn Authenticator>,
	backoff: Backoff,
	config: ClientConfig,
	observer: Option<RedactingObserver>,
}

/// Client for the Vane feature flags service.
///
/// Cheap to clone; clones share connections and configuration.
#[derive(Clone)]
pub struct FlagsClient {
	inner: Arc<ClientInner>,
}

impl FlagsClient {
	/// Creates a new builder for configuring the client.
	pub fn builder() -> FlagsClientBuilder {
		FlagsClientBuilder::new()
	}

	pub fn base_url(&self) -> &str {
		&self.inner.base_url
	}

	pub fn config(&self) -> &ClientConfig {
		&self.inner.config
	}

	/// Resolves a path against the base URL.
	pub fn url(&self, path: &str) -> Result<Url> {
		join_url(&self.inner.base_url, path)
	}

	/// An HTTP transport for one watch request.
	pub fn event_transport(&self, request: WatchRequest) -> HttpTransport {
		HttpTransport::new(
			self.inner.stream_http.clone(),
			self.inner.stream_url.clone(),
			request,
			Arc::clone(&self.inner.auth),
		)
		.with_observer(self.inner.observer.clone())
	}

	/// A watcher for `request` using this client's watch configuration.
	pub fn watcher(&self, request: WatchRequest) -> Watcher<HttpTransport> {
		Watcher::with_backoff(
			self.event_transport(request),
			self.inner.config.watch.clone(),
			self.inner.backoff.clone(),
		)
	}

	/// Streams events into `on_event` until it fails or `cancel` fires.
	///
	/// See [`Watcher::run`].
	pub async fn watch_events<F, E>(
		&self,
		request: WatchRequest,
		cancel: &CancellationToken,
		on_event: F,
	) -> std::result::Result<Infallible, WatchError<E>>
	where
		F: FnMut(StreamEvent) -> std::result::Result<(), E>,
	{
		self.watcher(request).run(cancel, on_event).await
	}

	/// Runs a watch on a background task.
	pub fn spawn_watch<F, E>(&self, request: WatchRequest, on_event: F) -> WatchHandle<E>
	where
		F: FnMut(StreamEvent) -> std::result::Result<(), E> + Send + 'static,
		E: Send + 'static,
	{
		WatchHandle::spawn(self.watcher(request), on_event)
	}

	/// `GET path`, decoding a JSON response.
	pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
		let body = self.send(Method::GET, path, None).await?;
		decode(&body)
	}

	/// `POST path` with a JSON body, decoding a JSON response.
	pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: Serialize + ?Sized,
		T: DeserializeOwned,
	{
		let body = serde_json::to_value(body).map_err(FlagsError::EncodeFailed)?;
		let body = self.send(Method::POST, path, Some(body)).await?;
		decode(&body)
	}

	/// `PUT path` with a JSON body, decoding a JSON response.
	pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: Serialize + ?Sized,
		T: DeserializeOwned,
	{
		let body = serde_json::to_value(body).map_err(FlagsError::EncodeFailed)?;
		let body = self.send(Method::PUT, path, Some(body)).await?;
		decode(&body)
	}

	/// `DELETE path`, ignoring any response body.
	pub async fn delete(&self, path: &str) -> Result<()> {
		self.send(Method::DELETE, path, None).await?;
		Ok(())
	}

	async fn send(
		&self,
		method: Method,
		path: &str,
		body: Option<serde_json::Value>,
	) -> Result<Bytes> {
		let url = self.url(path)?;
		retry(&self.inner.config.retry_config, || {
			self.send_once(method.clone(), url.clone(), body.as_ref())
		})
		.await
	}

	async fn send_once(
		&self,
		method: Method,
		url: Url,
		body: Option<&serde_json::Value>,
	) -> Result<Bytes> {
		let mut builder = self.inner.http.request(method, url);
		if let Some(body) = body {
			builder = builder.json(body);
		}
		let request = self
			.inner
			.auth
			.authenticate(builder)
			.build()
			.map_err(FlagsError::RequestFailed)?;

		if let Some(observer) = &self.inner.observer {
			observer.request(&request);
		}
		debug!(method = %request.method(), url = %request.url(), "Sending request");

		let response = self
			.inner
			.http
			.execute(request)
			.await
			.map_err(FlagsError::RequestFailed)?;

		let status = response.status();
		let url = response.url().clone();
		let headers = response.headers().clone();
		let body = response.bytes().await.map_err(FlagsError::RequestFailed)?;

		if let Some(observer) = &self.inner.observer {
			observer.observe_response(status, &url, &headers, Body::from_bytes(&body));
		}

		check_status(status, &url, &headers, &body)?;
		Ok(body)
	}
}

impl fmt::Debug for FlagsClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FlagsClient")
			.field("base_url", &self.inner.base_url)
			.field("auth", &self.inner.auth)
			.finish_non_exhaustive()
	}
}

fn check_status(status: StatusCode, url: &Url, headers: &HeaderMap, body: &[u8]) -> Result<()> {
	if status.is_success() {
		return Ok(());
	}

	match status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FlagsError::AuthenticationFailed {
			status: status.as_u16(),
		}),
		StatusCode::NOT_FOUND => Err(FlagsError::NotFound {
			url: url.to_string(),
		}),
		StatusCode::TOO_MANY_REQUESTS => {
			let retry_after_secs = headers
				.get(RETRY_AFTER)
				.and_then(|v| v.to_str().ok())
				.and_then(|v| v.trim().parse().ok());
			Err(FlagsError::RateLimited { retry_after_secs })
		}
		_ => Err(FlagsError::ServerError {
			status: status.as_u16(),
			message: String::from_utf8_lossy(body).into_owned(),
		}),
	}
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
	serde_json::from_slice(body).map_err(|e| FlagsError::ParseFailed(e.to_string()))
}
