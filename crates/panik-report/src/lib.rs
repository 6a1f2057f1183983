// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP reporting backend for panik.
//!
//! [`HttpReporter`] implements [`panik_core::Reporter`] against a crash
//! capture endpoint addressed by a DSN of the form
//! `https://<public_key>@<host>/<project_id>`.
//!
//! # Quick Start
//!
//! ```ignore
//! use panik_report::HttpReporter;
//!
//! let reporter = HttpReporter::builder()
//!     .dsn("https://pk_live@crash.example.com/proj_123")
//!     .environment("production")
//!     .release("ledger@4be1c0d")
//!     .app_name("ledger")
//!     .build()?;
//! ```
//!
//! Reports are queued and delivered by a background `panik-transport`
//! thread. Failed deliveries are never retried; they are printed to stderr
//! unless [`HttpReporterBuilder::on_delivery_failure`] says otherwise.

mod backtrace;
mod dsn;
mod error;
mod http;
mod payload;
mod reporter;
mod transport;

pub use dsn::Dsn;
pub use error::{DsnError, Result, SetupError};
pub use http::user_agent;
pub use reporter::{HttpReporter, HttpReporterBuilder, ReporterConfig};
pub use transport::DeliveryFailureHandler;

pub use panik_core::{EventId, Level, NormalizedError, ReportError, ReportEvent, Reporter};
