// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for panik, the process-level crash handler.
//!
//! This crate holds everything the exit controller and the reporters agree
//! on, without pulling in an HTTP stack:
//!
//! - [`Throwable`]: whatever was raised (a panic, a `std::error::Error`, an
//!   explicit [`ErrorObject`], or an arbitrary JSON value)
//! - [`normalize`]: turns a throwable into a [`NormalizedError`] that can be
//!   printed and reported
//! - [`Reporter`]: the seam for an optional remote error-reporting backend
//! - [`ReportEvent`], [`Level`], [`EventId`]: what gets sent to a backend

pub mod error;
pub mod event;
pub mod normalize;
pub mod reporter;
pub mod throwable;

pub use error::{InvalidLevel, ReportError, Result};
pub use event::{EventId, Level, ReportEvent};
pub use normalize::{
	normalize, NormalizedError, PrepareError, DEFAULT_EXIT_CODE, NON_ERROR_PREFIX, UNKNOWN_ERROR,
};
pub use reporter::Reporter;
pub use throwable::{ErrorObject, PanicReport, Shape, Throwable};
