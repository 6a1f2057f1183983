// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process-wide hooks for uncaught panics and unhandled rejections.

use std::future::Future;
use std::panic::{self, PanicHookInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use panik_core::Throwable;
use tracing::{debug, info, warn};

use crate::controller::Panik;
use crate::error::{PanikError, Result};

/// Set while an [`Installation`] owns the process hooks.
static INSTALLED: AtomicBool = AtomicBool::new(false);

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

enum Rejection {
	Raised(Throwable),
	Stop,
}

/// Accepts unhandled failures from asynchronous code.
///
/// Rejections are queued and handled on the `panik-rejections` thread, so
/// the code that raised has finished unwinding before anything is printed.
#[derive(Clone)]
pub struct RejectionSink {
	sender: Sender<Rejection>,
}

impl RejectionSink {
	/// Hands an unhandled failure to the exit controller.
	pub fn reject(&self, raw: impl Into<Throwable>) {
		if self.sender.send(Rejection::Raised(raw.into())).is_err() {
			warn!("Rejection raised after panik was uninstalled, dropping it");
		}
	}

	/// Spawns `future` on the current Tokio runtime and rejects its error.
	///
	/// The handle resolves to the future's value, or `None` when it failed.
	/// Must be called from within a Tokio runtime.
	pub fn spawn<F, T, E>(&self, future: F) -> tokio::task::JoinHandle<Option<T>>
	where
		F: Future<Output = std::result::Result<T, E>> + Send + 'static,
		T: Send + 'static,
		E: Into<Throwable> + Send + 'static,
	{
		let sink = self.clone();
		tokio::spawn(async move {
			match future.await {
				Ok(value) => Some(value),
				Err(e) => {
					sink.reject(e);
					None
				}
			}
		})
	}
}

/// The installed hooks. Call [`Installation::uninstall`] to tear them down;
/// dropping it leaves the hooks in place for the rest of the process.
#[must_use = "dropping the installation loses the rejection sink"]
pub struct Installation {
	panik: Arc<Panik>,
	sink: RejectionSink,
	listener: Option<JoinHandle<()>>,
	previous_hook: Option<PanicHook>,
}

impl Panik {
	/// Installs the panic hook and starts the rejection listener.
	///
	/// Only one controller may be installed per process at a time.
	pub fn install(self: Arc<Self>) -> Result<Installation> {
		if INSTALLED
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_err()
		{
			return Err(PanikError::AlreadyInstalled);
		}

		let (sender, receiver) = mpsc::channel();
		let listener = match spawn_listener(Arc::clone(&self), receiver) {
			Ok(listener) => listener,
			Err(e) => {
				INSTALLED.store(false, Ordering::SeqCst);
				return Err(PanikError::Listener(e));
			}
		};

		let previous_hook = panic::take_hook();
		let hooked = Arc::clone(&self);
		panic::set_hook(Box::new(move |info| {
			if Panik::is_handling() {
				// Unwinds into the controller's own catch_unwind.
				debug!("Panic inside panik's error handling");
				return;
			}
			debug!("Uncaught panic, handing to exit controller");
			hooked.print_error_and_exit(Throwable::from_panic(info));
			hooked.hold();
		}));

		info!(reporter = self.has_reporter(), "panik installed");

		Ok(Installation {
			panik: self,
			sink: RejectionSink { sender },
			listener: Some(listener),
			previous_hook: Some(previous_hook),
		})
	}
}

impl Installation {
	pub fn panik(&self) -> &Arc<Panik> {
		&self.panik
	}

	/// A sink for unhandled asynchronous failures.
	pub fn rejections(&self) -> RejectionSink {
		self.sink.clone()
	}

	/// Restores the previous panic hook and stops the rejection listener.
	///
	/// Rejections already queued are handled first. Afterwards another
	/// controller may be installed.
	pub fn uninstall(mut self) {
		if let Some(previous) = self.previous_hook.take() {
			panic::set_hook(previous);
		}

		let _ = self.sink.sender.send(Rejection::Stop);
		if let Some(listener) = self.listener.take() {
			if listener.join().is_err() {
				warn!("Rejection listener panicked");
			}
		}

		INSTALLED.store(false, Ordering::SeqCst);
		info!("panik uninstalled");
	}
}

fn spawn_listener(panik: Arc<Panik>, receiver: Receiver<Rejection>) -> std::io::Result<JoinHandle<()>> {
	thread::Builder::new()
		.name("panik-rejections".to_string())
		.spawn(move || {
			for rejection in receiver {
				match rejection {
					Rejection::Raised(raw) => {
						debug!("Unhandled rejection, handing to exit controller");
						panik.print_error_and_exit(raw);
					}
					Rejection::Stop => break,
				}
			}
		})
}
