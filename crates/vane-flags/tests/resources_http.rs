// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Generic JSON resource helpers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use vane_common_http::{Body, DiagnosticSink, RequestMeta, ResponseMeta, REDACTED};
use vane_flags::{FlagsClient, FlagsError, RedactingObserver, RetryConfig};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Project {
	id: String,
	name: String,
}

fn client(server: &MockServer) -> FlagsClient {
	FlagsClient::builder()
		.base_url(server.uri())
		.bearer_token("tok")
		.retry_config(RetryConfig {
			max_attempts: 3,
			delay: Duration::from_millis(5),
			jitter: false,
		})
		.build()
		.unwrap()
}

#[tokio::test]
async fn get_json_decodes_response() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/v1/projects/p1"))
		.and(header("authorization", "Bearer tok"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p1", "name": "Storefront"})))
		.expect(1)
		.mount(&server)
		.await;

	let project: Project = client(&server).get_json("/v1/projects/p1").await.unwrap();

	assert_eq!(
		project,
		Project {
			id: "p1".to_string(),
			name: "Storefront".to_string(),
		}
	);
}

#[tokio::test]
async fn post_and_put_send_json_bodies() {
	let server = MockServer::start().await;
	let project = Project {
		id: "p2".to_string(),
		name: "Checkout".to_string(),
	};
	Mock::given(method("POST"))
		.and(path("/v1/projects"))
		.and(body_json(json!({"id": "p2", "name": "Checkout"})))
		.respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "p2", "name": "Checkout"})))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("PUT"))
		.and(path("/v1/projects/p2"))
		.and(body_json(json!({"name": "Checkout v2"})))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p2", "name": "Checkout v2"})))
		.expect(1)
		.mount(&server)
		.await;

	let client = client(&server);
	let created: Project = client.post_json("/v1/projects", &project).await.unwrap();
	assert_eq!(created, project);

	let updated: Project = client
		.put_json("/v1/projects/p2", &json!({"name": "Checkout v2"}))
		.await
		.unwrap();
	assert_eq!(updated.name, "Checkout v2");
}

#[tokio::test]
async fn delete_ignores_body() {
	let server = MockServer::start().await;
	Mock::given(method("DELETE"))
		.and(path("/v1/projects/p1"))
		.respond_with(ResponseTemplate::new(204))
		.expect(1)
		.mount(&server)
		.await;

	client(&server).delete("/v1/projects/p1").await.unwrap();
}

#[tokio::test]
async fn server_errors_are_retried() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(502))
		.up_to_n_times(2)
		.expect(2)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
		.expect(1)
		.mount(&server)
		.await;

	let projects: Vec<Project> = client(&server).get_json("/v1/projects").await.unwrap();
	assert!(projects.is_empty());
}

#[tokio::test]
async fn persistent_server_error_is_reported() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
		.expect(3)
		.mount(&server)
		.await;

	let err = client(&server)
		.get_json::<Vec<Project>>("/v1/projects")
		.await
		.unwrap_err();

	match err {
		FlagsError::ServerError { status, message } => {
			assert_eq!(status, 500);
			assert_eq!(message, "database unavailable");
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn client_errors_map_without_retry() {
	let server = MockServer::start().await;
	Mock::given(path("/v1/missing"))
		.respond_with(ResponseTemplate::new(404))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(path("/v1/secret"))
		.respond_with(ResponseTemplate::new(403))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(path("/v1/busy"))
		.respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(path("/v1/bad"))
		.respond_with(ResponseTemplate::new(400).set_body_string("bad key"))
		.expect(1)
		.mount(&server)
		.await;

	let client = client(&server);

	let err = client.get_json::<Project>("/v1/missing").await.unwrap_err();
	assert!(matches!(err, FlagsError::NotFound { ref url } if url.ends_with("/v1/missing")));

	let err = client.get_json::<Project>("/v1/secret").await.unwrap_err();
	assert!(matches!(err, FlagsError::AuthenticationFailed { status: 403 }));

	let err = client.get_json::<Project>("/v1/busy").await.unwrap_err();
	assert!(matches!(
		err,
		FlagsError::RateLimited {
			retry_after_secs: Some(12)
		}
	));

	let err = client.delete("/v1/bad").await.unwrap_err();
	assert!(matches!(err, FlagsError::ServerError { status: 400, .. }));
}

#[tokio::test]
async fn malformed_json_is_parse_error() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(200).set_body_string("not json"))
		.mount(&server)
		.await;

	let err = client(&server)
		.get_json::<Project>("/v1/projects/p1")
		.await
		.unwrap_err();
	assert!(matches!(err, FlagsError::ParseFailed(_)));
}

#[derive(Default)]
struct RecordingSink {
	requests: Mutex<Vec<RequestMeta>>,
	responses: Mutex<Vec<ResponseMeta>>,
}

impl DiagnosticSink for RecordingSink {
	fn request(&self, meta: &RequestMeta) {
		self.requests.lock().unwrap().push(meta.clone());
	}

	fn response(&self, meta: &ResponseMeta) {
		self.responses.lock().unwrap().push(meta.clone());
	}
}

#[tokio::test]
async fn verbose_output_includes_response_bodies() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/v1/projects"))
		.respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "p3", "name": "Search"})))
		.mount(&server)
		.await;
	Mock::given(method("DELETE"))
		.respond_with(ResponseTemplate::new(204))
		.mount(&server)
		.await;

	let sink = Arc::new(RecordingSink::default());
	let client = FlagsClient::builder()
		.base_url(server.uri())
		.bearer_token("tok")
		.observer(RedactingObserver::new(sink.clone()))
		.build()
		.unwrap();

	let created: Project = client
		.post_json("/v1/projects", &json!({"name": "Search"}))
		.await
		.unwrap();
	assert_eq!(created.id, "p3");
	client.delete("/v1/projects/p3").await.unwrap();

	let requests = sink.requests.lock().unwrap();
	assert_eq!(requests[0].body, Body::Text(r#"{"name":"Search"}"#.to_string()));
	assert!(requests[0]
		.headers
		.iter()
		.any(|(n, v)| n == "authorization" && v == REDACTED));

	let responses = sink.responses.lock().unwrap();
	assert_eq!(responses.len(), 2);
	assert_eq!(responses[0].status, 201);
	match &responses[0].body {
		Body::Text(text) => {
			let logged: serde_json::Value = serde_json::from_str(text).unwrap();
			assert_eq!(logged, json!({"id": "p3", "name": "Search"}));
		}
		other => panic!("unexpected body: {other:?}"),
	}
	assert_eq!(responses[1].status, 204);
	assert_eq!(responses[1].body, Body::Empty);
}
