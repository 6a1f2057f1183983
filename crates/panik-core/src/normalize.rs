// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error normalization.
//!
//! Every value that reaches the crash handler goes through [`normalize`]
//! exactly once. The result always has a message, so printing and reporting
//! never need to branch on what was originally raised.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;

use crate::throwable::{Shape, Throwable};

/// Exit code used when the error does not carry a positive one.
pub const DEFAULT_EXIT_CODE: i32 = 1;

/// Prefix of the message synthesized for values that are not error-shaped.
pub const NON_ERROR_PREFIX: &str = "Non-error thrown: ";

/// Printed when an error has neither stack nor message.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Status the reporting backend answers with when it throttles us.
const RATE_LIMITED_STATUS: u16 = 429;

/// Last-resort match for rate-limit failures that arrive without a typed status.
static RATE_LIMITED_MESSAGE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"denied due to rate limiting|\b429\b").unwrap());

/// Transform applied to every raised value before normalization.
pub type PrepareError = Arc<dyn Fn(Throwable) -> Throwable + Send + Sync>;

/// A raised value coerced into something printable and reportable.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedError {
	/// Exception type used when reporting, e.g. `panic` or `Error`.
	pub kind: String,
	pub message: String,
	pub stack: Option<String>,
	/// Requested exit code; see [`NormalizedError::exit_code`].
	pub exit_code: Option<i32>,
	pub data: Option<Value>,
	/// HTTP status when this error came from the reporting backend itself.
	pub backend_status: Option<u16>,
}

impl Default for NormalizedError {
	fn default() -> Self {
		Self {
			kind: "Error".to_string(),
			message: String::new(),
			stack: None,
			exit_code: None,
			data: None,
			backend_status: None,
		}
	}
}

impl NormalizedError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			..Default::default()
		}
	}

	/// The code the process should exit with.
	pub fn exit_code(&self) -> i32 {
		self.exit_code
			.filter(|code| *code > 0)
			.unwrap_or(DEFAULT_EXIT_CODE)
	}

	/// Stack if present, else message, else [`UNKNOWN_ERROR`].
	pub fn diagnostic(&self) -> &str {
		match self.stack.as_deref() {
			Some(stack) if !stack.is_empty() => stack,
			_ if !self.message.is_empty() => &self.message,
			_ => UNKNOWN_ERROR,
		}
	}

	/// Whether this error is the reporting backend refusing our reports.
	///
	/// Keys off the typed backend status first and only falls back to
	/// matching the message text.
	pub fn is_rate_limited(&self) -> bool {
		match self.backend_status {
			Some(status) => status == RATE_LIMITED_STATUS,
			None => RATE_LIMITED_MESSAGE.is_match(&self.message),
		}
	}
}

/// Normalizes `raw`, applying `prepare` first when given.
pub fn normalize(raw: Throwable, prepare: Option<&PrepareError>) -> NormalizedError {
	let working = match prepare {
		Some(prepare) => prepare(raw),
		None => raw,
	};

	match working.classify() {
		Shape::StructuredError(error) => error,
		Shape::OpaqueValue(value) => NormalizedError::new(format!(
			"{NON_ERROR_PREFIX}{}",
			serde_json::to_string(&value).unwrap_or_else(|_| value.to_string())
		)),
	}
}
