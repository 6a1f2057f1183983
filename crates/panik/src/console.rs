// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The local console sink.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Where panik writes its human-readable output.
///
/// Implementations are called from panic hooks and must not panic.
pub trait Console: Send + Sync {
	/// Writes a diagnostic line (stderr).
	fn error(&self, line: &str);

	/// Writes an informational line (stdout).
	fn log(&self, line: &str);
}

/// Writes to the process's stderr and stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdConsole;

impl Console for StdConsole {
	fn error(&self, line: &str) {
		let _ = writeln!(io::stderr().lock(), "{line}");
	}

	fn log(&self, line: &str) {
		let _ = writeln!(io::stdout().lock(), "{line}");
	}
}

/// Output stream of a captured line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
	Stdout,
	Stderr,
}

/// Keeps every line in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryConsole {
	lines: Arc<Mutex<Vec<(Stream, String)>>>,
}

impl MemoryConsole {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every line in the order written.
	pub fn lines(&self) -> Vec<(Stream, String)> {
		match self.lines.lock() {
			Ok(lines) => lines.clone(),
			Err(poisoned) => poisoned.into_inner().clone(),
		}
	}

	pub fn stderr(&self) -> Vec<String> {
		self.stream(Stream::Stderr)
	}

	pub fn stdout(&self) -> Vec<String> {
		self.stream(Stream::Stdout)
	}

	fn stream(&self, stream: Stream) -> Vec<String> {
		self.lines()
			.into_iter()
			.filter(|(s, _)| *s == stream)
			.map(|(_, line)| line)
			.collect()
	}

	fn push(&self, stream: Stream, line: &str) {
		let mut lines = match self.lines.lock() {
			Ok(lines) => lines,
			Err(poisoned) => poisoned.into_inner(),
		};
		lines.push((stream, line.to_string()));
	}
}

impl Console for MemoryConsole {
	fn error(&self, line: &str) {
		self.push(Stream::Stderr, line);
	}

	fn log(&self, line: &str) {
		self.push(Stream::Stdout, line);
	}
}
