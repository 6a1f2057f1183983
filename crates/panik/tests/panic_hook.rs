// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The panic hook is process-global, so everything touching it lives in a
//! single test.

use std::sync::Arc;

use panik::{ErrorObject, MemoryConsole, Panik, PanikError, RecordingTerminator};
use serde_json::json;

fn controller(console: &MemoryConsole, terminator: &RecordingTerminator) -> Arc<Panik> {
	Arc::new(
		Panik::builder()
			.console(console.clone())
			.terminator(terminator.clone())
			.build(),
	)
}

#[test]
fn installed_hook_handles_the_first_panic_only() {
	let console = MemoryConsole::new();
	let terminator = RecordingTerminator::new();
	let panik = controller(&console, &terminator);
	let installation = Arc::clone(&panik).install().unwrap();

	let other = controller(&MemoryConsole::new(), &RecordingTerminator::new());
	assert!(matches!(other.install(), Err(PanikError::AlreadyInstalled)));

	let first = std::panic::catch_unwind(|| panic!("ledger corrupted"));
	assert!(first.is_err());

	let stderr = console.stderr();
	assert_eq!(stderr[0], "Unhandled error in process");
	assert!(stderr[1].starts_with("thread '"));
	assert!(stderr[1].contains("panicked at"));
	assert!(stderr[1].contains("ledger corrupted"));
	assert!(stderr[1].contains("stack backtrace:"));
	assert_eq!(stderr[2], "Exiting in 2 sec...");
	assert_eq!(terminator.exit_code(), Some(1));
	assert!(panik.is_exiting());

	let second = std::panic::catch_unwind(|| panic!("second failure"));
	assert!(second.is_err());
	installation.rejections().reject("late rejection");

	installation.uninstall();

	assert_eq!(terminator.scheduled().len(), 1);
	assert!(!console
		.stderr()
		.iter()
		.any(|line| line.contains("second failure") || line.contains("late rejection")));

	let again = controller(&MemoryConsole::new(), &RecordingTerminator::new());
	again.install().unwrap().uninstall();

	// Typed payloads keep their message and exit code.
	let (stderr, code) = panic_with(|| std::panic::panic_any(ErrorObject::new("disk full").with_code(28)));
	assert_eq!(
		stderr,
		vec![
			"Unhandled error in process",
			"disk full",
			"Exiting in 2 sec...",
			"Exiting with code 28",
		]
	);
	assert_eq!(code, Some(28));

	let (stderr, code) = panic_with(|| std::panic::panic_any(std::io::Error::from_raw_os_error(5)));
	assert_eq!(code, Some(5));
	assert_eq!(stderr.len(), 4);

	let (stderr, code) = panic_with(|| std::panic::panic_any(json!({ "message": "quota exceeded", "code": 7 })));
	assert_eq!(stderr[1], "quota exceeded");
	assert_eq!(code, Some(7));

	let (stderr, code) = panic_with(|| {
		let error: Box<dyn std::error::Error + Send + Sync> = "journal unreadable".into();
		std::panic::panic_any(error)
	});
	assert_eq!(stderr[1], "journal unreadable");
	assert_eq!(code, Some(1));

	let (stderr, code) = panic_with(|| std::panic::panic_any(42u8));
	assert_eq!(stderr[1], "Non-error thrown: \"Box<dyn Any>\"");
	assert_eq!(code, Some(1));
}

/// Installs a fresh controller, panics with `raise`, and uninstalls.
fn panic_with(raise: fn()) -> (Vec<String>, Option<i32>) {
	let console = MemoryConsole::new();
	let terminator = RecordingTerminator::new();
	let installation = controller(&console, &terminator).install().unwrap();

	assert!(std::panic::catch_unwind(raise).is_err());
	installation.uninstall();

	(console.stderr(), terminator.exit_code())
}
