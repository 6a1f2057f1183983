// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Raw raised values and their classification.

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt::Write as _;
use std::panic::PanicHookInfo;

use serde_json::Value;

use crate::error::ReportError;
use crate::normalize::NormalizedError;

/// Serialized form used for panic payloads of a type panik does not know.
const OPAQUE_PANIC_PAYLOAD: &str = "Box<dyn Any>";

/// An explicit error with the fields a crash handler cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorObject {
	pub message: String,
	pub stack: Option<String>,
	/// Process exit code requested by this error.
	pub code: Option<i32>,
	/// Structured payload printed and attached to the report.
	pub data: Option<Value>,
}

impl ErrorObject {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			..Default::default()
		}
	}

	pub fn with_code(mut self, code: i32) -> Self {
		self.code = Some(code);
		self
	}

	pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
		self.stack = Some(stack.into());
		self
	}

	pub fn with_data(mut self, data: Value) -> Self {
		self.data = Some(data);
		self
	}
}

/// What a panic hook observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanicReport {
	/// Payload text; `None` when the payload was not a string.
	pub payload: Option<String>,
	/// `file:line:column` of the panic.
	pub location: Option<String>,
	pub thread: Option<String>,
	pub backtrace: Option<String>,
}

impl PanicReport {
	/// Captures the panic described by `info`, forcing a backtrace.
	pub fn capture(info: &PanicHookInfo<'_>) -> Self {
		let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
			Some(s.to_string())
		} else {
			info.payload().downcast_ref::<String>().cloned()
		};

		Self {
			payload,
			location: info
				.location()
				.map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
			thread: std::thread::current().name().map(str::to_string),
			backtrace: Some(Backtrace::force_capture().to_string()),
		}
	}

	fn render_stack(&self, message: &str) -> String {
		let mut stack = format!(
			"thread '{}' panicked",
			self.thread.as_deref().unwrap_or("<unnamed>")
		);
		if let Some(location) = &self.location {
			let _ = write!(stack, " at {location}");
		}
		let _ = write!(stack, ":\n{message}");
		if let Some(backtrace) = &self.backtrace {
			let _ = write!(stack, "\nstack backtrace:\n{backtrace}");
		}
		stack
	}
}

/// Any value that was raised or rejected.
#[derive(Debug)]
pub enum Throwable {
	Error(Box<dyn StdError + Send + Sync + 'static>),
	Object(ErrorObject),
	Panic(PanicReport),
	Value(Value),
	/// Already normalized, passed through unchanged.
	Normalized(NormalizedError),
}

/// Result of classifying a [`Throwable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
	/// The value carried a message or stack and is reported as-is.
	StructuredError(NormalizedError),
	/// Anything else; reported through its JSON serialization.
	OpaqueValue(Value),
}

impl Throwable {
	/// Wraps any `std::error::Error`.
	pub fn error<E>(error: E) -> Self
	where
		E: StdError + Send + Sync + 'static,
	{
		Self::Error(Box::new(error))
	}

	/// What a panic hook should hand to the exit controller.
	///
	/// Typed payloads raised with [`std::panic::panic_any`] keep their
	/// message and code: [`ErrorObject`], `serde_json::Value`, boxed
	/// `std::error::Error`s, [`anyhow::Error`] and [`std::io::Error`]. Any
	/// other payload is captured as a [`PanicReport`].
	pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
		let payload = info.payload();
		if let Some(object) = payload.downcast_ref::<ErrorObject>() {
			return Self::Object(object.clone());
		}
		if let Some(value) = payload.downcast_ref::<Value>() {
			return Self::Value(value.clone());
		}
		if let Some(error) = payload.downcast_ref::<Box<dyn StdError + Send + Sync>>() {
			return Self::Normalized(from_std_error(&**error));
		}
		if let Some(error) = payload.downcast_ref::<anyhow::Error>() {
			return Self::Normalized(from_std_error(&**error));
		}
		if let Some(error) = payload.downcast_ref::<std::io::Error>() {
			return Self::Normalized(from_std_error(error));
		}
		Self::Panic(PanicReport::capture(info))
	}

	/// Decides whether this value is error-shaped.
	pub fn classify(self) -> Shape {
		match self {
			Self::Error(error) => Shape::StructuredError(from_std_error(error.as_ref())),
			Self::Object(object) => Shape::StructuredError(NormalizedError {
				message: object.message,
				stack: object.stack,
				exit_code: object.code,
				data: object.data,
				..Default::default()
			}),
			Self::Panic(report) => match report.payload.clone() {
				Some(message) => Shape::StructuredError(NormalizedError {
					kind: "panic".to_string(),
					stack: Some(report.render_stack(&message)),
					message,
					..Default::default()
				}),
				None => Shape::OpaqueValue(Value::String(OPAQUE_PANIC_PAYLOAD.to_string())),
			},
			Self::Value(value) => classify_value(value),
			Self::Normalized(error) => Shape::StructuredError(error),
		}
	}
}

fn from_std_error(error: &(dyn StdError + 'static)) -> NormalizedError {
	let chain = || std::iter::successors(Some(error), |&e| e.source());

	let exit_code = chain().find_map(|e| {
		e.downcast_ref::<std::io::Error>()
			.and_then(std::io::Error::raw_os_error)
			.filter(|code| *code > 0)
	});
	let backend_status = chain().find_map(|e| {
		e.downcast_ref::<ReportError>()
			.and_then(ReportError::status)
	});

	let message = error.to_string();
	let mut causes = chain().skip(1).peekable();
	let stack = causes.peek().is_some().then(|| {
		let mut stack = format!("{message}\n\nCaused by:");
		for (i, cause) in causes.enumerate() {
			let _ = write!(stack, "\n    {i}: {cause}");
		}
		stack
	});

	NormalizedError {
		message,
		stack,
		exit_code,
		backend_status,
		..Default::default()
	}
}

fn classify_value(value: Value) -> Shape {
	let message = value.get("message").and_then(Value::as_str).map(str::to_string);
	let stack = value.get("stack").and_then(Value::as_str).map(str::to_string);
	if !value.is_object() || (message.is_none() && stack.is_none()) {
		return Shape::OpaqueValue(value);
	}

	let message = message.unwrap_or_else(|| {
		stack
			.as_deref()
			.and_then(|stack| stack.lines().next())
			.unwrap_or_default()
			.to_string()
	});

	Shape::StructuredError(NormalizedError {
		kind: value
			.get("name")
			.and_then(Value::as_str)
			.unwrap_or("Error")
			.to_string(),
		message,
		stack,
		exit_code: value
			.get("code")
			.and_then(Value::as_i64)
			.and_then(|code| i32::try_from(code).ok()),
		data: value.get("data").cloned(),
		backend_status: None,
	})
}

impl From<NormalizedError> for Throwable {
	fn from(error: NormalizedError) -> Self {
		Self::Normalized(error)
	}
}

impl From<&str> for Throwable {
	fn from(value: &str) -> Self {
		Self::Value(Value::String(value.to_string()))
	}
}

impl From<String> for Throwable {
	fn from(value: String) -> Self {
		Self::Value(Value::String(value))
	}
}

impl From<Value> for Throwable {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}

impl From<ErrorObject> for Throwable {
	fn from(object: ErrorObject) -> Self {
		Self::Object(object)
	}
}

impl From<PanicReport> for Throwable {
	fn from(report: PanicReport) -> Self {
		Self::Panic(report)
	}
}

impl From<ReportError> for Throwable {
	fn from(error: ReportError) -> Self {
		Self::error(error)
	}
}

impl From<std::io::Error> for Throwable {
	fn from(error: std::io::Error) -> Self {
		Self::error(error)
	}
}

impl From<anyhow::Error> for Throwable {
	fn from(error: anyhow::Error) -> Self {
		Self::Error(error.into())
	}
}
