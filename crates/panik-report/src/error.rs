// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for setting up the HTTP reporter.

use thiserror::Error;

/// Result type alias for reporter setup.
pub type Result<T> = std::result::Result<T, SetupError>;

/// Errors that prevent an [`HttpReporter`](crate::HttpReporter) from being built.
#[derive(Debug, Error)]
pub enum SetupError {
	/// No DSN was supplied.
	#[error("a DSN is required to report to a remote backend (set PANIK_DSN)")]
	MissingDsn,

	/// The DSN could not be parsed.
	#[error("invalid DSN: {0}")]
	InvalidDsn(#[from] DsnError),

	/// The HTTP client could not be built.
	#[error("failed to build HTTP client: {0}")]
	ClientBuild(#[source] reqwest::Error),

	/// The transport thread could not be started.
	#[error("failed to start transport thread: {0}")]
	Spawn(#[from] std::io::Error),

	/// The transport thread exited before it was ready.
	#[error("transport thread exited during startup")]
	WorkerExited,
}

/// Errors from parsing a DSN.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DsnError {
	#[error("not a URL: {0}")]
	InvalidUrl(#[from] url::ParseError),

	#[error("unsupported scheme {0:?}, expected http or https")]
	UnsupportedScheme(String),

	#[error("missing public key before '@'")]
	MissingPublicKey,

	#[error("missing host")]
	MissingHost,

	#[error("missing project ID path segment")]
	MissingProjectId,
}
