// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process-level crash handler.
//!
//! panik catches what nothing else handled, prints it, optionally reports it
//! to a remote crash capture endpoint, and exits the process with the
//! error's code (or 1) after a short grace period.
//!
//! - uncaught panics are caught by a panic hook
//! - unhandled asynchronous failures are sent through a [`RejectionSink`]
//! - only the first terminating error is handled; later ones are dropped
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let panik = Arc::new(panik::from_env()?);
//!     let installation = Arc::clone(&panik).install()?;
//!
//!     let rejections = installation.rejections();
//!     // Inside a Tokio runtime:
//!     // rejections.spawn(async { sync_ledger().await });
//!
//!     panik.report_message("ledger worker started");
//!     run()
//! }
//! ```
//!
//! # Configuration
//!
//! | Variable | Effect |
//! |---|---|
//! | `PANIK_DSN` / `PANIK_DSN_FILE` | remote endpoint; unset means console-only |
//! | `PANIK_ENVIRONMENT` | environment label, default `development` |
//! | `PANIK_APP_NAME`, `HEROKU_APP_NAME`, `APP` | application name |
//! | `PANIK_COMMIT`, `HEROKU_SLUG_COMMIT` | deploy commit, else `git rev-parse HEAD` |
//! | `PANIK_SERVER_NAME`, `DYNO`, `HOSTNAME` | server name attached to reports |

mod console;
mod controller;
mod error;
pub mod fallback;
mod install;
mod options;
mod terminate;

pub use console::{Console, MemoryConsole, StdConsole, Stream};
pub use controller::{Panik, PanikBuilder, DEFAULT_GRACE_PERIOD};
pub use error::{PanikError, Result};
pub use fallback::{from_config, from_env};
pub use install::{Installation, RejectionSink};
pub use options::ReportOptions;
pub use terminate::{ProcessTerminator, RecordingTerminator, ScheduledExit, Terminator};

pub use panik_config::PanikConfig;
pub use panik_core::{
	ErrorObject, EventId, Level, NormalizedError, ReportError, ReportEvent, Reporter, Throwable,
};

#[cfg(feature = "remote")]
pub use fallback::with_remote;
#[cfg(feature = "remote")]
pub use panik_report::HttpReporter;
