// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Prints live flag changes for a project until Ctrl-C.
//!
//! ```text
//! VANE_BASE_URL=https://flags.example.com \
//! VANE_CLIENT_ID=... VANE_CLIENT_SECRET=... \
//! RUST_LOG=vane_flags=debug \
//! cargo run -p vane-flags --example watch -- storefront prod
//! ```

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vane_flags::{CancellationToken, FlagsClientBuilder, WatchError, WatchRequest};

#[tokio::main]
async fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let mut args = std::env::args().skip(1);
	let project = args.next().context("usage: watch <project> [context]")?;
	let context = args.next().unwrap_or_default();

	let client = FlagsClientBuilder::from_env()?
		.build()
		.context("failed to configure flags client")?;

	let cancel = CancellationToken::new();
	let on_signal = cancel.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			on_signal.cancel();
		}
	});

	let request = WatchRequest::new(project).with_context(context);
	info!(base_url = %client.base_url(), "Watching for flag changes");

	let result = client
		.watch_events(request, &cancel, |event| -> Result<()> {
			let payload: serde_json::Value = event
				.json()
				.with_context(|| format!("event {} is not JSON", event.id))?;
			println!("{} {} {}", event.id, event.kind_or_default(), payload);
			Ok(())
		})
		.await;

	match result {
		Ok(never) => match never {},
		Err(WatchError::Cancelled) => Ok(()),
		Err(WatchError::Callback(e)) => Err(e),
	}
}
