// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types shared by reporters.

use thiserror::Error;

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors a [`Reporter`](crate::Reporter) can return.
#[derive(Debug, Error)]
pub enum ReportError {
	/// The reporter has been shut down.
	#[error("reporter has been shut down")]
	ClientShutdown,

	/// The report could not be delivered.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

	/// Backend returned a non-success status.
	#[error("server error (status {status}): {message}")]
	ServerError {
		/// HTTP status code.
		status: u16,
		/// Error message from the backend.
		message: String,
	},

	/// Backend refused the report because of rate limiting.
	#[error("report denied due to rate limiting (429), retry after {retry_after_secs:?} seconds")]
	RateLimited {
		/// Optional retry-after header value.
		retry_after_secs: Option<u64>,
	},

	/// Failed to serialize the report.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl ReportError {
	/// HTTP status attached to this error, if the backend answered at all.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::ServerError { status, .. } => Some(*status),
			Self::RateLimited { .. } => Some(429),
			_ => None,
		}
	}

	pub fn is_rate_limited(&self) -> bool {
		matches!(self, Self::RateLimited { .. })
	}
}

/// Returned when parsing an unknown [`Level`](crate::Level).
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid level: {0}")]
pub struct InvalidLevel(pub String);
