// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background delivery of capture requests.
//!
//! One `panik-transport` thread owns the blocking HTTP client and sends
//! requests in the order they were queued. Callers never wait on the
//! network; they only enqueue.

use std::io::Write;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use panik_config::SecretString;
use panik_core::{ReportError, Result};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::error::SetupError;
use crate::http;
use crate::payload::CaptureRequest;

/// Commands for the transport worker.
pub(crate) enum TransportCommand {
	/// Deliver a request.
	Send(Box<CaptureRequest>),
	/// Acknowledge once every earlier command has been handled.
	Flush(mpsc::Sender<()>),
	/// Stop after every earlier command has been handled.
	Shutdown,
}

/// Called on the transport thread with the event id of each report that
/// could not be delivered.
pub type DeliveryFailureHandler = Arc<dyn Fn(&str, &ReportError) + Send + Sync>;

/// Default [`DeliveryFailureHandler`]: one line on stderr.
pub(crate) fn print_delivery_failure(event_id: &str, error: &ReportError) {
	let _ = writeln!(
		std::io::stderr().lock(),
		"Failed to deliver event {event_id}: {error}"
	);
}

/// Where the worker delivers requests.
pub(crate) struct Endpoint {
	pub url: String,
	pub public_key: SecretString,
	pub timeout: Duration,
}

/// Handle to the transport worker thread.
pub(crate) struct Transport {
	sender: SyncSender<TransportCommand>,
	handle: Mutex<Option<JoinHandle<()>>>,
}

impl Transport {
	/// Starts the worker and waits until its HTTP client is built.
	pub fn spawn(
		endpoint: Endpoint,
		capacity: usize,
		on_failure: DeliveryFailureHandler,
	) -> std::result::Result<Self, SetupError> {
		let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
		let (ready_tx, ready_rx) = mpsc::channel();

		let handle = thread::Builder::new()
			.name("panik-transport".to_string())
			.spawn(move || {
				// Built here so the blocking client's runtime never lives on
				// a caller's async executor.
				let client = match http::builder(endpoint.timeout).build() {
					Ok(client) => client,
					Err(e) => {
						let _ = ready_tx.send(Err(e));
						return;
					}
				};
				let _ = ready_tx.send(Ok(()));
				run_worker(&client, &endpoint, receiver, on_failure.as_ref());
			})?;

		match ready_rx.recv() {
			Ok(Ok(())) => Ok(Self {
				sender,
				handle: Mutex::new(Some(handle)),
			}),
			Ok(Err(e)) => {
				let _ = handle.join();
				Err(SetupError::ClientBuild(e))
			}
			Err(_) => {
				let _ = handle.join();
				Err(SetupError::WorkerExited)
			}
		}
	}

	/// Queues `request` without blocking.
	pub fn enqueue(&self, request: CaptureRequest) -> Result<()> {
		match self
			.sender
			.try_send(TransportCommand::Send(Box::new(request)))
		{
			Ok(()) => Ok(()),
			Err(TrySendError::Full(_)) => {
				warn!("Report queue is full, dropping report");
				Err(ReportError::RequestFailed("report queue is full".into()))
			}
			Err(TrySendError::Disconnected(_)) => Err(ReportError::ClientShutdown),
		}
	}

	/// Waits up to `timeout` for every queued request to be handled.
	pub fn flush(&self, timeout: Duration) -> bool {
		let (ack_tx, ack_rx) = mpsc::channel();
		if self.sender.send(TransportCommand::Flush(ack_tx)).is_err() {
			return true;
		}
		match ack_rx.recv_timeout(timeout) {
			Ok(()) => true,
			Err(RecvTimeoutError::Timeout) => false,
			Err(RecvTimeoutError::Disconnected) => true,
		}
	}

	/// Drains the queue and joins the worker. Later calls do nothing.
	pub fn shutdown(&self) {
		let handle = match self.handle.lock() {
			Ok(mut guard) => guard.take(),
			Err(poisoned) => poisoned.into_inner().take(),
		};
		let Some(handle) = handle else {
			return;
		};

		let _ = self.sender.send(TransportCommand::Shutdown);
		if handle.join().is_err() {
			warn!("Transport thread panicked during shutdown");
		}
	}
}

fn run_worker(
	client: &Client,
	endpoint: &Endpoint,
	receiver: Receiver<TransportCommand>,
	on_failure: &(dyn Fn(&str, &ReportError) + Send + Sync),
) {
	debug!(url = %endpoint.url, "Transport started");

	for command in receiver {
		match command {
			TransportCommand::Send(request) => {
				if let Err(e) = deliver(client, endpoint, &request) {
					on_failure(&request.event_id, &e);
					warn!(event_id = %request.event_id, error = %e, "Failed to deliver report");
				}
			}
			TransportCommand::Flush(ack) => {
				let _ = ack.send(());
			}
			TransportCommand::Shutdown => break,
		}
	}

	debug!("Transport stopped");
}

fn deliver(client: &Client, endpoint: &Endpoint, request: &CaptureRequest) -> Result<()> {
	debug!(
		url = %endpoint.url,
		project_id = %request.project_id,
		event_id = %request.event_id,
		"Sending crash event"
	);

	let response = client
		.post(&endpoint.url)
		.header(AUTHORIZATION, format!("Bearer {}", endpoint.public_key.expose()))
		.json(request)
		.send()
		.map_err(|e| ReportError::RequestFailed(e.into()))?;

	if response.status() == StatusCode::TOO_MANY_REQUESTS {
		let retry_after = response
			.headers()
			.get(RETRY_AFTER)
			.and_then(|v| v.to_str().ok())
			.and_then(|s| s.parse().ok());
		return Err(ReportError::RateLimited {
			retry_after_secs: retry_after,
		});
	}

	if !response.status().is_success() {
		let status = response.status().as_u16();
		let message = response.text().unwrap_or_default();
		return Err(ReportError::ServerError { status, message });
	}

	info!(event_id = %request.event_id, "Crash event captured");
	Ok(())
}
