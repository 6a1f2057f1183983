// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The exit controller.
//!
//! [`Panik`] turns the first terminating error into one diagnostic print,
//! at most one report, and one scheduled exit. Every later terminating
//! error is dropped without output.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use panik_core::{normalize, EventId, NormalizedError, PrepareError, ReportEvent, Reporter, Throwable};
use tracing::{debug, warn};

use crate::console::{Console, StdConsole};
use crate::options::ReportOptions;
use crate::terminate::{ProcessTerminator, Terminator};

/// Time between the diagnostic print and process exit.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(2000);

thread_local! {
	/// Set while this thread runs a `prepare_error` callback or a reporter.
	static HANDLING: Cell<bool> = const { Cell::new(false) };
}

/// Builder for constructing a [`Panik`] controller.
pub struct PanikBuilder {
	reporter: Option<Arc<dyn Reporter>>,
	options: ReportOptions,
	pub(crate) console: Arc<dyn Console>,
	terminator: Arc<dyn Terminator>,
	grace_period: Duration,
}

impl PanikBuilder {
	pub fn new() -> Self {
		Self {
			reporter: None,
			options: ReportOptions::default(),
			console: Arc::new(StdConsole),
			terminator: Arc::new(ProcessTerminator),
			grace_period: DEFAULT_GRACE_PERIOD,
		}
	}

	/// Sets the remote reporter. Without one, reports are console-only.
	pub fn reporter<R>(mut self, reporter: R) -> Self
	where
		R: Reporter + 'static,
	{
		self.reporter = Some(Arc::new(reporter));
		self
	}

	pub fn shared_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
		self.reporter = Some(reporter);
		self
	}

	pub fn options(mut self, options: ReportOptions) -> Self {
		self.options = options;
		self
	}

	pub fn console<C>(mut self, console: C) -> Self
	where
		C: Console + 'static,
	{
		self.console = Arc::new(console);
		self
	}

	pub fn terminator<T>(mut self, terminator: T) -> Self
	where
		T: Terminator + 'static,
	{
		self.terminator = Arc::new(terminator);
		self
	}

	/// Sets how long to wait between printing and exiting. Defaults to 2 s.
	pub fn grace_period(mut self, grace_period: Duration) -> Self {
		self.grace_period = grace_period;
		self
	}

	pub fn build(self) -> Panik {
		Panik {
			reporter: self.reporter,
			prepare_error: self.options.prepare_error,
			console: self.console,
			terminator: self.terminator,
			grace_period: self.grace_period,
			exiting: AtomicBool::new(false),
		}
	}
}

impl Default for PanikBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// The crash handler's exit controller.
///
/// Exposes the same four operations whether or not a reporter is
/// configured; without one, reports only reach the console.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
///
/// let panik = Arc::new(panik::from_env()?);
/// let installation = Arc::clone(&panik).install()?;
///
/// panik.report_message("worker started");
/// installation.rejections().reject("connection pool exhausted");
/// ```
pub struct Panik {
	reporter: Option<Arc<dyn Reporter>>,
	prepare_error: Option<PrepareError>,
	console: Arc<dyn Console>,
	terminator: Arc<dyn Terminator>,
	grace_period: Duration,
	exiting: AtomicBool,
}

impl Panik {
	pub fn builder() -> PanikBuilder {
		PanikBuilder::new()
	}

	/// Whether a reporter is configured.
	pub fn has_reporter(&self) -> bool {
		self.reporter.is_some()
	}

	/// Whether the process is already on its way out.
	pub fn is_exiting(&self) -> bool {
		self.exiting.load(Ordering::SeqCst)
	}

	pub fn grace_period(&self) -> Duration {
		self.grace_period
	}

	/// Handles a terminating error: print, report, schedule exit.
	///
	/// Only the first call in the controller's lifetime does anything. A
	/// rate-limit error from the reporting backend is printed and exits
	/// like any other, but is not reported.
	pub fn print_error_and_exit(&self, raw: impl Into<Throwable>) {
		if self.exiting.swap(true, Ordering::SeqCst) {
			debug!("Already exiting, ignoring terminating error");
			return;
		}

		let error = self.normalize(raw.into());
		let code = error.exit_code();

		self.console.error("Unhandled error in process");
		self.console.error(error.diagnostic());
		if let Some(data) = &error.data {
			self.console.error(&format!("Error data {}", render_json(data)));
		}

		let event_id = if error.is_rate_limited() {
			debug!("Ignoring rate-limit error from reporting backend");
			None
		} else {
			self.capture("error", |reporter| reporter.capture_error(&error))
		};

		let grace = describe_grace(self.grace_period);
		match event_id {
			Some(id) => self
				.console
				.error(&format!("Reporting as event {id} and exiting in {grace}...")),
			None => self.console.error(&format!("Exiting in {grace}...")),
		}

		debug!(code, kind = %error.kind, "Scheduling exit");
		self.terminator
			.schedule(code, self.grace_period, Arc::clone(&self.console));
	}

	/// Prints and reports an error without exiting.
	pub fn report_error(&self, raw: impl Into<Throwable>) -> Option<EventId> {
		let error = self.normalize(raw.into());

		self.console.error(&format!("ERROR {}", error.diagnostic()));
		if let Some(data) = &error.data {
			self.console.error(&format!("ERROR data {}", render_json(data)));
		}

		self.capture("error", |reporter| reporter.capture_error(&error))
	}

	pub fn report_message(&self, message: &str) -> Option<EventId> {
		self.console.log(&format!("LOG {message}"));
		self.capture("message", |reporter| reporter.capture_message(message))
	}

	pub fn report_event(&self, event: &ReportEvent) -> Option<EventId> {
		let rendered = serde_json::to_string(event).unwrap_or_else(|_| format!("{event:?}"));
		self.console.log(&format!("EVENT {rendered}"));
		self.capture("event", |reporter| reporter.capture_event(event))
	}

	/// Parks the calling thread until the scheduled exit.
	pub(crate) fn hold(&self) {
		self.terminator.hold();
	}

	/// Whether the current thread is inside a user callback run by a
	/// controller. Panics raised there are caught by the controller.
	pub(crate) fn is_handling() -> bool {
		HANDLING.with(Cell::get)
	}

	/// Normalizes `raw`. A panicking `prepare_error` yields an error
	/// describing that panic instead.
	fn normalize(&self, raw: Throwable) -> NormalizedError {
		match guarded(|| normalize(raw, self.prepare_error.as_ref())) {
			Ok(error) => error,
			Err(payload) => {
				let message = panic_message(payload.as_ref());
				warn!(%message, "prepare_error panicked");
				NormalizedError::new(format!("Failed to prepare error: {message}"))
			}
		}
	}

	/// Hands a report to the reporter. Failures are printed, never raised.
	fn capture<F>(&self, what: &str, send: F) -> Option<EventId>
	where
		F: FnOnce(&dyn Reporter) -> panik_core::Result<EventId>,
	{
		let reporter = self.reporter.as_deref()?;
		let failure = match guarded(|| send(reporter)) {
			Ok(Ok(id)) => return Some(id),
			Ok(Err(e)) => e.to_string(),
			Err(payload) => format!("reporter panicked: {}", panic_message(payload.as_ref())),
		};
		self.console.error(&format!("Failed to report {what}: {failure}"));
		warn!(error = %failure, what, "Failed to report");
		None
	}
}

/// Runs `f` with [`HANDLING`] set, catching any panic it raises.
fn guarded<T>(f: impl FnOnce() -> T) -> std::thread::Result<T> {
	let previous = HANDLING.with(|handling| handling.replace(true));
	let result = panic::catch_unwind(AssertUnwindSafe(f));
	HANDLING.with(|handling| handling.set(previous));
	result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"Box<dyn Any>".to_string()
	}
}

fn render_json(value: &serde_json::Value) -> String {
	serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

fn describe_grace(grace: Duration) -> String {
	if grace.subsec_millis() == 0 {
		format!("{} sec", grace.as_secs())
	} else {
		format!("{} ms", grace.as_millis())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use panik_core::{ErrorObject, ReportError};
	use serde_json::json;

	use super::*;
	use crate::console::MemoryConsole;
	use crate::terminate::{RecordingTerminator, ScheduledExit};

	#[derive(Default)]
	struct FakeReporter {
		errors: Mutex<Vec<NormalizedError>>,
		messages: Mutex<Vec<String>>,
		events: Mutex<Vec<ReportEvent>>,
		fail: bool,
	}

	impl FakeReporter {
		fn failing() -> Self {
			Self {
				fail: true,
				..Default::default()
			}
		}

		fn result(&self) -> panik_core::Result<EventId> {
			if self.fail {
				Err(ReportError::ServerError {
					status: 500,
					message: "backend down".to_string(),
				})
			} else {
				Ok(EventId::new())
			}
		}
	}

	impl Reporter for FakeReporter {
		fn capture_error(&self, error: &NormalizedError) -> panik_core::Result<EventId> {
			self.errors.lock().unwrap().push(error.clone());
			self.result()
		}

		fn capture_message(&self, message: &str) -> panik_core::Result<EventId> {
			self.messages.lock().unwrap().push(message.to_string());
			self.result()
		}

		fn capture_event(&self, event: &ReportEvent) -> panik_core::Result<EventId> {
			self.events.lock().unwrap().push(event.clone());
			self.result()
		}
	}

	struct Harness {
		panik: Panik,
		console: MemoryConsole,
		terminator: RecordingTerminator,
		reporter: Option<Arc<FakeReporter>>,
	}

	fn harness(reporter: Option<FakeReporter>) -> Harness {
		let console = MemoryConsole::new();
		let terminator = RecordingTerminator::new();
		let reporter = reporter.map(Arc::new);

		let mut builder = Panik::builder()
			.console(console.clone())
			.terminator(terminator.clone());
		if let Some(reporter) = &reporter {
			builder = builder.shared_reporter(reporter.clone());
		}

		Harness {
			panik: builder.build(),
			console,
			terminator,
			reporter,
		}
	}

	#[test]
	fn first_error_prints_reports_and_schedules() {
		let h = harness(Some(FakeReporter::default()));

		h.panik.print_error_and_exit(ErrorObject::new("disk full").with_code(28));

		let stderr = h.console.stderr();
		assert_eq!(stderr[0], "Unhandled error in process");
		assert_eq!(stderr[1], "disk full");
		assert!(stderr[2].starts_with("Reporting as event "));
		assert!(stderr[2].ends_with(" and exiting in 2 sec..."));
		assert_eq!(stderr[3], "Exiting with code 28");

		assert_eq!(
			h.terminator.scheduled(),
			vec![ScheduledExit {
				code: 28,
				grace: DEFAULT_GRACE_PERIOD
			}]
		);
		assert_eq!(h.reporter.unwrap().errors.lock().unwrap().len(), 1);
		assert!(h.panik.is_exiting());
	}

	#[test]
	fn second_error_is_ignored() {
		let h = harness(Some(FakeReporter::default()));

		h.panik.print_error_and_exit("first");
		let printed = h.console.stderr().len();
		h.panik.print_error_and_exit("second");

		assert_eq!(h.console.stderr().len(), printed);
		assert_eq!(h.terminator.scheduled().len(), 1);
		assert_eq!(h.reporter.unwrap().errors.lock().unwrap().len(), 1);
	}

	#[test]
	fn missing_code_exits_with_one() {
		let h = harness(None);
		h.panik.print_error_and_exit(ErrorObject::new("no code"));
		assert_eq!(h.terminator.exit_code(), Some(1));
	}

	#[test]
	fn non_positive_code_exits_with_one() {
		let h = harness(None);
		h.panik.print_error_and_exit(ErrorObject::new("zero").with_code(0));
		assert_eq!(h.terminator.exit_code(), Some(1));
	}

	#[test]
	fn explicit_code_is_used() {
		let h = harness(None);
		h.panik.print_error_and_exit(ErrorObject::new("seven").with_code(7));
		assert_eq!(h.terminator.exit_code(), Some(7));
	}

	#[test]
	fn without_reporter_prints_plain_exit_line() {
		let h = harness(None);
		h.panik.print_error_and_exit("boom");

		assert_eq!(
			h.console.stderr(),
			vec![
				"Unhandled error in process",
				"Non-error thrown: \"boom\"",
				"Exiting in 2 sec...",
				"Exiting with code 1",
			]
		);
	}

	#[test]
	fn data_is_printed() {
		let h = harness(None);
		h.panik
			.print_error_and_exit(ErrorObject::new("bad row").with_data(json!({ "row": 7 })));
		assert!(h.console.stderr().contains(&"Error data {\"row\":7}".to_string()));
	}

	#[test]
	fn rate_limited_message_is_printed_but_not_reported() {
		let h = harness(Some(FakeReporter::default()));

		h.panik
			.print_error_and_exit(ErrorObject::new("Event denied due to rate limiting"));

		assert!(h.reporter.unwrap().errors.lock().unwrap().is_empty());
		assert!(h
			.console
			.stderr()
			.contains(&"Event denied due to rate limiting".to_string()));
		assert_eq!(h.terminator.exit_code(), Some(1));
	}

	#[test]
	fn typed_rate_limit_is_not_reported() {
		let h = harness(Some(FakeReporter::default()));

		h.panik.print_error_and_exit(ReportError::RateLimited {
			retry_after_secs: Some(30),
		});

		assert!(h.reporter.unwrap().errors.lock().unwrap().is_empty());
		assert_eq!(h.terminator.scheduled().len(), 1);
	}

	#[test]
	fn reporter_failure_does_not_prevent_exit() {
		let h = harness(Some(FakeReporter::failing()));

		h.panik.print_error_and_exit("boom");

		let stderr = h.console.stderr();
		assert!(stderr
			.iter()
			.any(|line| line.starts_with("Failed to report error: server error (status 500)")));
		assert!(stderr.contains(&"Exiting in 2 sec...".to_string()));
		assert_eq!(h.terminator.exit_code(), Some(1));
	}

	#[test]
	fn prepare_error_runs_first() {
		let console = MemoryConsole::new();
		let terminator = RecordingTerminator::new();
		let panik = Panik::builder()
			.console(console.clone())
			.terminator(terminator.clone())
			.options(ReportOptions::new().with_prepare_error(|_raw| {
				Throwable::from(ErrorObject::new("prepared").with_code(3))
			}))
			.build();

		panik.print_error_and_exit("raw");

		assert_eq!(console.stderr()[1], "prepared");
		assert_eq!(terminator.exit_code(), Some(3));
	}

	#[test]
	fn panicking_prepare_error_still_exits() {
		let console = MemoryConsole::new();
		let terminator = RecordingTerminator::new();
		let panik = Panik::builder()
			.console(console.clone())
			.terminator(terminator.clone())
			.options(ReportOptions::new().with_prepare_error(|_raw| panic!("cannot prepare")))
			.build();

		panik.print_error_and_exit("bad");
		panik.print_error_and_exit("later real error");

		let stderr = console.stderr();
		assert_eq!(stderr[0], "Unhandled error in process");
		assert_eq!(stderr[1], "Failed to prepare error: cannot prepare");
		assert_eq!(stderr.last().unwrap(), "Exiting with code 1");
		assert_eq!(terminator.scheduled().len(), 1);
		assert!(!Panik::is_handling());
	}

	#[test]
	fn panicking_reporter_does_not_prevent_exit() {
		struct PanickingReporter;

		impl Reporter for PanickingReporter {
			fn capture_error(&self, _error: &NormalizedError) -> panik_core::Result<EventId> {
				panic!("reporter exploded")
			}

			fn capture_message(&self, _message: &str) -> panik_core::Result<EventId> {
				panic!("reporter exploded")
			}

			fn capture_event(&self, _event: &ReportEvent) -> panik_core::Result<EventId> {
				panic!("reporter exploded")
			}
		}

		let console = MemoryConsole::new();
		let terminator = RecordingTerminator::new();
		let panik = Panik::builder()
			.console(console.clone())
			.terminator(terminator.clone())
			.reporter(PanickingReporter)
			.build();

		assert_eq!(panik.report_message("still alive"), None);
		panik.print_error_and_exit(ErrorObject::new("disk full").with_code(28));

		let stderr = console.stderr();
		assert!(stderr.contains(&"Failed to report message: reporter panicked: reporter exploded".to_string()));
		assert!(stderr.contains(&"Failed to report error: reporter panicked: reporter exploded".to_string()));
		assert!(stderr.contains(&"Exiting in 2 sec...".to_string()));
		assert_eq!(terminator.exit_code(), Some(28));
	}

	#[test]
	fn report_error_prints_and_reports_without_exiting() {
		let h = harness(Some(FakeReporter::default()));

		let id = h
			.panik
			.report_error(ErrorObject::new("soft failure").with_data(json!([1, 2])));

		assert!(id.is_some());
		assert_eq!(
			h.console.stderr(),
			vec!["ERROR soft failure", "ERROR data [1,2]"]
		);
		assert!(h.terminator.scheduled().is_empty());
		assert!(!h.panik.is_exiting());
	}

	#[test]
	fn report_error_without_reporter_is_console_only() {
		let h = harness(None);
		assert_eq!(h.panik.report_error("soft"), None);
		assert_eq!(h.console.stderr(), vec!["ERROR Non-error thrown: \"soft\""]);
	}

	#[test]
	fn report_message_logs_to_stdout() {
		let h = harness(Some(FakeReporter::default()));
		assert!(h.panik.report_message("cache warmed").is_some());
		assert_eq!(h.console.stdout(), vec!["LOG cache warmed"]);
		assert_eq!(
			*h.reporter.unwrap().messages.lock().unwrap(),
			vec!["cache warmed".to_string()]
		);
	}

	#[test]
	fn report_event_logs_json() {
		let h = harness(Some(FakeReporter::default()));
		let event = ReportEvent::new("deploy finished");

		h.panik.report_event(&event);

		let stdout = h.console.stdout();
		assert_eq!(stdout.len(), 1);
		assert!(stdout[0].starts_with("EVENT {"));
		assert!(stdout[0].contains("\"message\":\"deploy finished\""));
		assert_eq!(h.reporter.unwrap().events.lock().unwrap()[0], event);
	}

	#[test]
	fn custom_grace_period_is_described() {
		let console = MemoryConsole::new();
		let panik = Panik::builder()
			.console(console.clone())
			.terminator(RecordingTerminator::new())
			.grace_period(Duration::from_millis(250))
			.build();

		panik.print_error_and_exit("boom");

		assert!(console.stderr().contains(&"Exiting in 250 ms...".to_string()));
	}

	#[test]
	fn concurrent_errors_schedule_one_exit() {
		let h = harness(Some(FakeReporter::default()));
		let panik = Arc::new(h.panik);

		let threads: Vec<_> = (0..8)
			.map(|i| {
				let panik = Arc::clone(&panik);
				std::thread::spawn(move || panik.print_error_and_exit(format!("error {i}")))
			})
			.collect();
		for t in threads {
			t.join().unwrap();
		}

		assert_eq!(h.terminator.scheduled().len(), 1);
		assert_eq!(h.reporter.unwrap().errors.lock().unwrap().len(), 1);
		assert_eq!(
			h.console
				.stderr()
				.iter()
				.filter(|line| *line == "Unhandled error in process")
				.count(),
			1
		);
	}
}
