// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Vane.
//!
//! This crate provides:
//! - A client builder with a consistent User-Agent header
//! - A client builder for long-lived streaming responses
//! - Fixed-count retry for transient failures
//! - A request/response observer that masks credentials before logging

mod client;
mod observer;
mod retry;

pub use client::{builder, streaming_builder, user_agent};
pub use observer::{
	is_sensitive, redact_headers, Body, DiagnosticSink, RedactingObserver, RequestMeta,
	ResponseMeta, TracingSink, REDACTED, SENSITIVE_HEADERS,
};
pub use retry::{retry, RetryConfig, RetryableError};
