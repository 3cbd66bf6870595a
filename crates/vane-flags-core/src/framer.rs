// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Incremental line framing for the event stream.
//!
//! Network reads arrive in arbitrary chunks. The framer buffers them and
//! only releases lines once their `\n` terminator has been seen, so the
//! output does not depend on where the chunk boundaries fall.

use bytes::{Buf, BytesMut};

const LF: u8 = b'\n';
const CR: u8 = b'\r';

/// Splits a byte stream into lines.
///
/// Lines are returned without their `\n` terminator and without one
/// trailing `\r`, so both LF and CRLF streams are accepted. Invalid UTF-8
/// is replaced with U+FFFD rather than failing the stream.
#[derive(Debug, Default)]
pub struct LineFramer {
	buffer: BytesMut,
	/// Prefix of `buffer` already known to contain no `\n`.
	scanned: usize,
}

impl LineFramer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a chunk read from the connection.
	pub fn push(&mut self, chunk: &[u8]) {
		self.buffer.extend_from_slice(chunk);
	}

	/// Returns the next complete line, or `None` if more input is needed.
	pub fn next_line(&mut self) -> Option<String> {
		let Some(pos) = self.buffer[self.scanned..].iter().position(|&b| b == LF) else {
			self.scanned = self.buffer.len();
			return None;
		};

		let line = self.buffer.split_to(self.scanned + pos);
		self.buffer.advance(1);
		self.scanned = 0;

		let line = match &line[..] {
			[rest @ .., CR] => rest,
			all => all,
		};
		Some(String::from_utf8_lossy(line).into_owned())
	}

	/// Drains every complete line currently buffered.
	pub fn lines(&mut self) -> impl Iterator<Item = String> + '_ {
		std::iter::from_fn(move || self.next_line())
	}

	/// Number of bytes waiting for a terminator.
	pub fn pending_bytes(&self) -> usize {
		self.buffer.len()
	}

	/// Ends the input.
	///
	/// An unterminated trailing line is never a protocol line, so it is
	/// dropped. Returns how many bytes were discarded.
	pub fn finish(&mut self) -> usize {
		let dropped = self.buffer.len();
		self.buffer.clear();
		self.scanned = 0;
		dropped
	}
}
