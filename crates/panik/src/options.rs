// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::sync::Arc;

use panik_core::{PrepareError, Throwable};

/// Options fixed when the controller is built.
#[derive(Clone, Default)]
pub struct ReportOptions {
	/// Release reports are grouped under. Derived when unset.
	pub release: Option<String>,
	/// Applied to every raised value before it is normalized.
	pub prepare_error: Option<PrepareError>,
	/// Overrides the configured application name.
	pub app_name: Option<String>,
}

impl ReportOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_release(mut self, release: impl Into<String>) -> Self {
		self.release = Some(release.into());
		self
	}

	pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
		self.app_name = Some(app_name.into());
		self
	}

	pub fn with_prepare_error<F>(mut self, prepare: F) -> Self
	where
		F: Fn(Throwable) -> Throwable + Send + Sync + 'static,
	{
		self.prepare_error = Some(Arc::new(prepare));
		self
	}
}

impl fmt::Debug for ReportOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReportOptions")
			.field("release", &self.release)
			.field("prepare_error", &self.prepare_error.as_ref().map(|_| "<fn>"))
			.field("app_name", &self.app_name)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builders_set_fields() {
		let options = ReportOptions::new()
			.with_release("ledger@1.0.0")
			.with_app_name("ledger")
			.with_prepare_error(|raw| raw);

		assert_eq!(options.release.as_deref(), Some("ledger@1.0.0"));
		assert_eq!(options.app_name.as_deref(), Some("ledger"));
		assert!(options.prepare_error.is_some());
	}

	#[test]
	fn debug_hides_closure() {
		let options = ReportOptions::new().with_prepare_error(|raw| raw);
		let debug = format!("{options:?}");
		assert!(debug.contains("prepare_error: Some(\"<fn>\")"));
	}
}
