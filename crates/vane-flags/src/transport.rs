// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Opening event stream connections.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, Method, Url};
use tracing::debug;
use vane_common_http::{Body, RedactingObserver};
use vane_flags_core::WatchRequest;

use crate::auth::Authenticator;
use crate::error::TransportError;

/// Header used to resume a stream after the last delivered event.
pub const LAST_EVENT_ID_HEADER: &str = "Last-Event-ID";

/// An open response body, read incrementally.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Opens one connection to the event stream.
///
/// `last_event_id` is the id of the last event the caller has handled, if
/// any. Implementations return the body only once the server has accepted
/// the request.
#[async_trait]
pub trait EventTransport: Send + Sync {
	async fn open(&self, last_event_id: Option<&str>) -> Result<ByteStream, TransportError>;
}

#[async_trait]
impl<T: EventTransport + ?Sized> EventTransport for Arc<T> {
	async fn open(&self, last_event_id: Option<&str>) -> Result<ByteStream, TransportError> {
		(**self).open(last_event_id).await
	}
}

/// Event stream over HTTP.
///
/// Sends a GET, or a POST with the JSON payload when the watch request
/// carries one.
#[derive(Clone, Debug)]
pub struct HttpTransport {
	client: Client,
	url: Url,
	request: WatchRequest,
	auth: Arc<dyn Authenticator>,
	observer: Option<RedactingObserver>,
}

impl HttpTransport {
	/// `client` should not have a whole-request timeout; see
	/// [`vane_common_http::streaming_builder`].
	pub fn new(client: Client, url: Url, request: WatchRequest, auth: Arc<dyn Authenticator>) -> Self {
		Self {
			client,
			url,
			request,
			auth,
			observer: None,
		}
	}

	pub fn with_observer(mut self, observer: Option<RedactingObserver>) -> Self {
		self.observer = observer;
		self
	}

	pub fn watch_request(&self) -> &WatchRequest {
		&self.request
	}

	/// Builds the request for one connection attempt.
	pub fn build_request(&self, last_event_id: Option<&str>) -> Result<reqwest::Request, TransportError> {
		let method = if self.request.has_payload() {
			Method::POST
		} else {
			Method::GET
		};

		let mut builder = self
			.client
			.request(method, self.url.clone())
			.header(ACCEPT, "text/event-stream")
			.header(CACHE_CONTROL, "no-cache");

		let query = self.request.query_pairs();
		if !query.is_empty() {
			builder = builder.query(&query);
		}
		if let Some(id) = last_event_id.filter(|id| !id.is_empty()) {
			builder = builder.header(LAST_EVENT_ID_HEADER, id);
		}
		if let Some(payload) = &self.request.payload {
			builder = builder.json(payload);
		}

		self
			.auth
			.authenticate(builder)
			.build()
			.map_err(|e| TransportError::InvalidRequest(e.to_string()))
	}
}

#[async_trait]
impl EventTransport for HttpTransport {
	async fn open(&self, last_event_id: Option<&str>) -> Result<ByteStream, TransportError> {
		let request = self.build_request(last_event_id)?;
		if let Some(observer) = &self.observer {
			observer.request(&request);
		}

		debug!(
			method = %request.method(),
			url = %request.url(),
			resuming = last_event_id.is_some_and(|id| !id.is_empty()),
			"Opening event stream"
		);

		let response = self
			.client
			.execute(request)
			.await
			.map_err(|e| TransportError::Connect(e.to_string()))?;

		if let Some(observer) = &self.observer {
			observer.response(&response, Body::Streaming);
		}

		let status = response.status();
		if !status.is_success() {
			return Err(TransportError::ServerRejected {
				status: status.as_u16(),
			});
		}

		Ok(response.bytes_stream().map_err(io::Error::other).boxed())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::auth::{Credentials, NoAuth, CLIENT_ID_HEADER, CLIENT_SECRET_HEADER};
	use serde_json::json;

	fn transport(request: WatchRequest, auth: Arc<dyn Authenticator>) -> HttpTransport {
		HttpTransport::new(
			Client::new(),
			Url::parse("https://flags.example.com/v1/watch").unwrap(),
			request,
			auth,
		)
	}

	#[test]
	fn get_without_payload() {
		let t = transport(
			WatchRequest::new("storefront").with_targets(["web", "ios"]),
			Arc::new(NoAuth),
		);
		let request = t.build_request(None).unwrap();

		assert_eq!(request.method(), Method::GET);
		assert_eq!(
			request.url().as_str(),
			"https://flags.example.com/v1/watch?project=storefront&targets=web%2Cios"
		);
		assert_eq!(request.headers()[ACCEPT], "text/event-stream");
		assert_eq!(request.headers()[CACHE_CONTROL], "no-cache");
		assert!(request.headers().get(LAST_EVENT_ID_HEADER).is_none());
		assert!(request.body().is_none());
	}

	#[test]
	fn post_with_payload() {
		let t = transport(
			WatchRequest::new("p").with_payload(json!({"country": "NZ"})),
			Arc::new(NoAuth),
		);
		let request = t.build_request(None).unwrap();

		assert_eq!(request.method(), Method::POST);
		let body = request.body().and_then(|b| b.as_bytes()).unwrap();
		assert_eq!(
			serde_json::from_slice::<serde_json::Value>(body).unwrap(),
			json!({"country": "NZ"})
		);
	}

	#[test]
	fn resumption_header_only_when_non_empty() {
		let t = transport(WatchRequest::default(), Arc::new(NoAuth));

		let request = t.build_request(Some("42")).unwrap();
		assert_eq!(request.headers()[LAST_EVENT_ID_HEADER], "42");

		let request = t.build_request(Some("")).unwrap();
		assert!(request.headers().get(LAST_EVENT_ID_HEADER).is_none());
	}

	#[test]
	fn credentials_are_attached() {
		let t = transport(
			WatchRequest::default(),
			Arc::new(Credentials::new("client-7", "hunter2")),
		);
		let request = t.build_request(None).unwrap();

		assert_eq!(request.headers()[CLIENT_ID_HEADER], "client-7");
		assert_eq!(request.headers()[CLIENT_SECRET_HEADER], "hunter2");
	}

	#[test]
	fn empty_request_has_no_query() {
		let t = transport(WatchRequest::default(), Arc::new(NoAuth));
		let request = t.build_request(None).unwrap();
		assert_eq!(request.url().query(), None);
	}
}
