// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use vane_common_http::{retry, RetryConfig, RetryableError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast() -> RetryConfig {
	RetryConfig {
		max_attempts: 3,
		delay: Duration::from_millis(5),
		jitter: false,
	}
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<String, reqwest::Error> {
	client
		.get(url)
		.send()
		.await?
		.error_for_status()?
		.text()
		.await
}

#[tokio::test]
async fn retries_server_errors_until_success() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/v1/projects"))
		.respond_with(ResponseTemplate::new(503))
		.up_to_n_times(2)
		.expect(2)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/v1/projects"))
		.respond_with(ResponseTemplate::new(200).set_body_string("ok"))
		.expect(1)
		.mount(&server)
		.await;

	let client = vane_common_http::builder().build().unwrap();
	let url = format!("{}/v1/projects", server.uri());
	let body = retry(&fast(), || fetch(&client, &url)).await.unwrap();

	assert_eq!(body, "ok");
}

#[tokio::test]
async fn client_errors_are_not_retried() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(404))
		.expect(1)
		.mount(&server)
		.await;

	let client = vane_common_http::builder().build().unwrap();
	let url = format!("{}/v1/missing", server.uri());
	let err = retry(&fast(), || fetch(&client, &url)).await.unwrap_err();

	assert!(!err.is_retryable());
	assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(500))
		.expect(3)
		.mount(&server)
		.await;

	let client = vane_common_http::builder().build().unwrap();
	let url = format!("{}/v1/flaky", server.uri());
	let err = retry(&fast(), || fetch(&client, &url)).await.unwrap_err();

	assert!(err.is_retryable());
}

#[tokio::test]
async fn sends_vane_user_agent() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(wiremock::matchers::header(
			"user-agent",
			vane_common_http::user_agent().as_str(),
		))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;

	let client = vane_common_http::builder().build().unwrap();
	let response = client.get(server.uri()).send().await.unwrap();
	assert!(response.status().is_success());
}
