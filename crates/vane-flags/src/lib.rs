// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feature flags Rust SDK for Vane.
//!
//! The interesting part of this crate is the live-update channel: a
//! long-lived HTTP event stream that survives disconnects, resumes from the
//! last delivered event, and backs off while the service is unavailable.
//! Resource endpoints are reached through generic JSON helpers.
//!
//! # Example
//!
//! ```ignore
//! use vane_flags::{CancellationToken, FlagsClient, WatchRequest};
//!
//! let client = FlagsClient::builder()
//!     .base_url("https://flags.example.com")
//!     .credentials("client-id", "client-secret")
//!     .build()?;
//!
//! let cancel = CancellationToken::new();
//! let request = WatchRequest::new("storefront").with_context("prod");
//!
//! let err = client
//!     .watch_events(request, &cancel, |event| {
//!         println!("{} {}", event.kind_or_default(), event.data);
//!         Ok::<(), std::io::Error>(())
//!     })
//!     .await
//!     .unwrap_err();
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use auth::{Authenticator, BearerToken, Credentials, NoAuth, Secret};
pub use client::{FlagsClient, FlagsClientBuilder};
pub use config::{ClientConfig, WatchConfig};
pub use error::{FlagsError, Result, TransportError, WatchError};
pub use transport::{ByteStream, EventTransport, HttpTransport, LAST_EVENT_ID_HEADER};
pub use watcher::{WatchExit, WatchHandle, WatchStats, Watcher};

pub use tokio_util::sync::CancellationToken;
pub use vane_common_http::{DiagnosticSink, RedactingObserver, RetryConfig};
pub use vane_flags_core::{BackoffPolicy, BackoffPolicyError, StreamEvent, WatchRequest};
