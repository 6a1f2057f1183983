// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scheduled process termination.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, error};

use crate::console::Console;

/// Ends the process once the controller has decided to exit.
pub trait Terminator: Send + Sync {
	/// Arms termination with `code` after `grace`. Must return immediately
	/// and cannot be cancelled.
	fn schedule(&self, code: i32, grace: Duration, console: Arc<dyn Console>);

	/// Blocks the calling thread until the scheduled termination happens.
	fn hold(&self);
}

/// Exits the real process from a `panik-exit` thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
	fn schedule(&self, code: i32, grace: Duration, console: Arc<dyn Console>) {
		let spawned = thread::Builder::new()
			.name("panik-exit".to_string())
			.spawn({
				let console = Arc::clone(&console);
				move || {
					thread::sleep(grace);
					exit(code, console.as_ref());
				}
			});

		if let Err(e) = spawned {
			error!(error = %e, "Failed to start exit timer, exiting now");
			exit(code, console.as_ref());
		}
		debug!(code, grace_ms = grace.as_millis() as u64, "Exit scheduled");
	}

	fn hold(&self) {
		loop {
			thread::park();
		}
	}
}

fn exit(code: i32, console: &dyn Console) -> ! {
	console.error(&format!("Exiting with code {code}"));
	std::process::exit(code)
}

/// A termination that was requested from a [`RecordingTerminator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledExit {
	pub code: i32,
	pub grace: Duration,
}

/// Records scheduled exits instead of ending the process.
///
/// Prints the exit line right away so console output reads as it would in
/// a real crash. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingTerminator {
	scheduled: Arc<Mutex<Vec<ScheduledExit>>>,
}

impl RecordingTerminator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn scheduled(&self) -> Vec<ScheduledExit> {
		match self.scheduled.lock() {
			Ok(scheduled) => scheduled.clone(),
			Err(poisoned) => poisoned.into_inner().clone(),
		}
	}

	/// Code of the first scheduled exit.
	pub fn exit_code(&self) -> Option<i32> {
		self.scheduled().first().map(|exit| exit.code)
	}
}

impl Terminator for RecordingTerminator {
	fn schedule(&self, code: i32, grace: Duration, console: Arc<dyn Console>) {
		let mut scheduled = match self.scheduled.lock() {
			Ok(scheduled) => scheduled,
			Err(poisoned) => poisoned.into_inner(),
		};
		scheduled.push(ScheduledExit { code, grace });
		console.error(&format!("Exiting with code {code}"));
	}

	fn hold(&self) {}
}
