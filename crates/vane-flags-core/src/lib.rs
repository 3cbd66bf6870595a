// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core protocol types for the Vane feature flags event stream.
//!
//! Everything in this crate is free of I/O so it can be driven by any
//! transport and tested without a network:
//!
//! - [`LineFramer`] turns arbitrarily chunked bytes into text lines
//! - [`EventAssembler`] folds lines into [`StreamEvent`]s
//! - [`Backoff`] decides how long to wait between connection attempts
//! - [`WatchRequest`] describes what a watch subscribes to
//!
//! # Example
//!
//! ```
//! use vane_flags_core::{EventAssembler, LineFramer, LineOutcome};
//!
//! let mut framer = LineFramer::new();
//! let mut assembler = EventAssembler::new();
//! let mut events = Vec::new();
//!
//! for chunk in [&b"id: 1\nda"[..], &b"ta: hello\n\n"[..]] {
//!     framer.push(chunk);
//!     while let Some(line) = framer.next_line() {
//!         if let LineOutcome::Dispatch(event) = assembler.feed(&line) {
//!             events.push(event);
//!         }
//!     }
//! }
//!
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].id, "1");
//! assert_eq!(events[0].data, "hello");
//! ```

pub mod assembler;
pub mod backoff;
pub mod event;
pub mod framer;
pub mod request;

pub use assembler::{EventAssembler, LineOutcome};
pub use backoff::{Backoff, BackoffPolicy, BackoffPolicyError, Disconnect};
pub use event::StreamEvent;
pub use framer::LineFramer;
pub use request::WatchRequest;
