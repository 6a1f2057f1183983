// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The remote reporting seam.

use crate::error::Result;
use crate::event::{EventId, ReportEvent};
use crate::normalize::NormalizedError;

/// A remote error-reporting backend.
///
/// Every method is fire-and-forget: implementations hand back an
/// [`EventId`] as soon as the report is queued and deliver it in the
/// background. Methods are called from panic hooks, so they must not block
/// on the network and must not panic.
pub trait Reporter: Send + Sync {
	fn capture_error(&self, error: &NormalizedError) -> Result<EventId>;

	fn capture_message(&self, message: &str) -> Result<EventId>;

	fn capture_event(&self, event: &ReportEvent) -> Result<EventId>;
}
