// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The HTTP reporter and its builder.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use panik_config::{SecretString, DEFAULT_ENVIRONMENT};
use panik_core::{EventId, NormalizedError, ReportError, ReportEvent, Reporter};
use tracing::{debug, info};

use crate::dsn::Dsn;
use crate::error::{Result, SetupError};
use crate::payload::{CaptureRequest, EventContext};
use crate::transport::{print_delivery_failure, DeliveryFailureHandler, Endpoint, Transport};

/// Tunables for the HTTP reporter.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
	/// Timeout for each HTTP request.
	pub request_timeout: Duration,
	/// Reports that may wait for delivery before new ones are dropped.
	pub queue_capacity: usize,
}

impl Default for ReporterConfig {
	fn default() -> Self {
		Self {
			request_timeout: Duration::from_secs(5),
			queue_capacity: 64,
		}
	}
}

/// Builder for constructing an [`HttpReporter`].
#[derive(Default)]
pub struct HttpReporterBuilder {
	dsn: Option<SecretString>,
	environment: Option<String>,
	release: Option<String>,
	app_name: Option<String>,
	server_name: Option<String>,
	on_delivery_failure: Option<DeliveryFailureHandler>,
	config: ReporterConfig,
}

impl fmt::Debug for HttpReporterBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HttpReporterBuilder")
			.field("dsn", &self.dsn)
			.field("environment", &self.environment)
			.field("release", &self.release)
			.field("app_name", &self.app_name)
			.field("server_name", &self.server_name)
			.field("on_delivery_failure", &self.on_delivery_failure.is_some())
			.field("config", &self.config)
			.finish()
	}
}

impl HttpReporterBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the DSN. Required.
	///
	/// Example: `https://pk_live@crash.example.com/proj_123`
	pub fn dsn(mut self, dsn: impl Into<String>) -> Self {
		self.dsn = Some(SecretString::new(dsn.into()));
		self
	}

	/// Sets the environment name. Defaults to `development`.
	pub fn environment(mut self, environment: impl Into<String>) -> Self {
		self.environment = Some(environment.into());
		self
	}

	/// Sets the release.
	///
	/// Example: `ledger@4be1c0d`
	pub fn release(mut self, release: impl Into<String>) -> Self {
		self.release = Some(release.into());
		self
	}

	/// Sets the application name, tagged as `app` on every report.
	pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
		self.app_name = Some(app_name.into());
		self
	}

	/// Sets the server name for identification.
	pub fn server_name(mut self, name: impl Into<String>) -> Self {
		self.server_name = Some(name.into());
		self
	}

	/// Sets what happens when a queued report cannot be delivered. Runs on
	/// the transport thread. Defaults to a line on stderr.
	pub fn on_delivery_failure<F>(mut self, handler: F) -> Self
	where
		F: Fn(&str, &ReportError) + Send + Sync + 'static,
	{
		self.on_delivery_failure = Some(Arc::new(handler));
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = timeout;
		self
	}

	pub fn queue_capacity(mut self, capacity: usize) -> Self {
		self.config.queue_capacity = capacity;
		self
	}

	/// Parses the DSN and starts the transport thread.
	///
	/// Fails fast when the DSN is missing or malformed.
	pub fn build(self) -> Result<HttpReporter> {
		let dsn: Dsn = self.dsn.ok_or(SetupError::MissingDsn)?.expose().parse()?;

		let context = EventContext {
			project_id: dsn.project_id().to_string(),
			environment: self
				.environment
				.unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
			release: self.release,
			server_name: self.server_name,
			app_name: self.app_name,
		};

		let transport = Transport::spawn(
			Endpoint {
				url: dsn.capture_url(),
				public_key: dsn.public_key().clone(),
				timeout: self.config.request_timeout,
			},
			self.config.queue_capacity,
			self.on_delivery_failure
				.unwrap_or_else(|| Arc::new(print_delivery_failure) as DeliveryFailureHandler),
		)?;

		info!(
			dsn = %dsn,
			environment = %context.environment,
			release = ?context.release,
			"Crash reporter initialized"
		);

		Ok(HttpReporter {
			context,
			transport,
			closed: AtomicBool::new(false),
		})
	}
}

/// Reports errors and events to a crash capture endpoint.
///
/// Every capture returns as soon as the report is queued. Call
/// [`HttpReporter::flush`] to wait for delivery.
pub struct HttpReporter {
	context: EventContext,
	transport: Transport,
	closed: AtomicBool,
}

impl HttpReporter {
	pub fn builder() -> HttpReporterBuilder {
		HttpReporterBuilder::new()
	}

	pub fn environment(&self) -> &str {
		&self.context.environment
	}

	pub fn release(&self) -> Option<&str> {
		self.context.release.as_deref()
	}

	/// Waits up to `timeout` for queued reports to be delivered.
	///
	/// Returns `false` if the timeout elapsed first.
	pub fn flush(&self, timeout: Duration) -> bool {
		self.transport.flush(timeout)
	}

	/// Delivers queued reports and stops the transport thread.
	///
	/// Captures after shutdown fail with [`ReportError::ClientShutdown`].
	pub fn shutdown(&self) {
		if self.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		self.transport.shutdown();
		info!("Crash reporter shutdown");
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	fn submit(&self, event_id: EventId, request: CaptureRequest) -> panik_core::Result<EventId> {
		if self.is_closed() {
			return Err(ReportError::ClientShutdown);
		}
		self.transport.enqueue(request)?;
		debug!(event_id = %event_id, "Report queued");
		Ok(event_id)
	}
}

impl Reporter for HttpReporter {
	fn capture_error(&self, error: &NormalizedError) -> panik_core::Result<EventId> {
		let event_id = EventId::new();
		self.submit(
			event_id,
			CaptureRequest::from_error(&self.context, event_id, error),
		)
	}

	fn capture_message(&self, message: &str) -> panik_core::Result<EventId> {
		let event_id = EventId::new();
		self.submit(
			event_id,
			CaptureRequest::from_message(&self.context, event_id, message),
		)
	}

	fn capture_event(&self, event: &ReportEvent) -> panik_core::Result<EventId> {
		let event_id = EventId::new();
		self.submit(
			event_id,
			CaptureRequest::from_event(&self.context, event_id, event),
		)
	}
}

impl Drop for HttpReporter {
	fn drop(&mut self) {
		self.shutdown();
	}
}
