// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scripted transport for driving sessions and watchers in tests.

use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::transport::{ByteStream, EventTransport};

/// How a scripted body ends after its chunks.
#[derive(Debug, Clone, Copy)]
pub enum End {
	Clean,
	Error,
	Hang,
}

/// One connection attempt.
#[derive(Debug, Clone)]
pub enum Script {
	Reject(u16),
	Body(Vec<String>, End),
}

impl Script {
	pub fn clean<I, S>(chunks: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Script::Body(chunks.into_iter().map(Into::into).collect(), End::Clean)
	}

	pub fn failing<I, S>(chunks: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Script::Body(chunks.into_iter().map(Into::into).collect(), End::Error)
	}

	pub fn hanging<I, S>(chunks: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Script::Body(chunks.into_iter().map(Into::into).collect(), End::Hang)
	}
}

/// Plays back one [`Script`] per `open`. Once the scripts run out it
/// cancels `exhausted` and rejects every further attempt.
#[derive(Debug)]
pub struct ScriptedTransport {
	scripts: Mutex<VecDeque<Script>>,
	opens: Mutex<Vec<(Instant, Option<String>)>>,
	exhausted: CancellationToken,
}

impl ScriptedTransport {
	pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
		Self {
			scripts: Mutex::new(scripts.into_iter().collect()),
			opens: Mutex::new(Vec::new()),
			exhausted: CancellationToken::new(),
		}
	}

	/// Cancelled when an `open` finds no script left.
	pub fn exhausted(&self) -> CancellationToken {
		self.exhausted.clone()
	}

	/// The resumption id passed to each `open`, in order.
	pub fn opened_with(&self) -> Vec<Option<String>> {
		self.opens.lock().unwrap().iter().map(|(_, id)| id.clone()).collect()
	}

	/// Gaps between consecutive `open` calls.
	pub fn gaps(&self) -> Vec<std::time::Duration> {
		let opens = self.opens.lock().unwrap();
		opens.windows(2).map(|w| w[1].0 - w[0].0).collect()
	}
}

#[async_trait]
impl EventTransport for ScriptedTransport {
	async fn open(&self, last_event_id: Option<&str>) -> Result<ByteStream, TransportError> {
		self.opens
			.lock()
			.unwrap()
			.push((Instant::now(), last_event_id.map(str::to_string)));

		let Some(script) = self.scripts.lock().unwrap().pop_front() else {
			self.exhausted.cancel();
			return Err(TransportError::ServerRejected { status: 503 });
		};

		match script {
			Script::Reject(status) => Err(TransportError::ServerRejected { status }),
			Script::Body(chunks, end) => {
				let body = stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))));
				let tail: ByteStream = match end {
					End::Clean => stream::empty().boxed(),
					End::Error => stream::once(async {
						Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"))
					})
					.boxed(),
					End::Hang => stream::pending().boxed(),
				};
				Ok(body.chain(tail).boxed())
			}
		}
	}
}
