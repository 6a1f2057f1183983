// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for setting up panik.

use panik_config::SecretEnvError;
use thiserror::Error;

/// Result type alias for panik setup.
pub type Result<T> = std::result::Result<T, PanikError>;

/// Errors raised while constructing or installing a [`Panik`](crate::Panik).
///
/// These are configuration errors and surface immediately; nothing here is
/// deferred to crash time.
#[derive(Debug, Error)]
pub enum PanikError {
	/// The remote reporter could not be set up.
	#[cfg(feature = "remote")]
	#[error(transparent)]
	Setup(#[from] panik_report::SetupError),

	/// A `*_FILE` secret could not be read.
	#[error(transparent)]
	SecretEnv(#[from] SecretEnvError),

	/// Another controller already owns the process hooks.
	#[error("panik is already installed in this process")]
	AlreadyInstalled,

	/// The rejection listener thread could not be started.
	#[error("failed to start rejection listener: {0}")]
	Listener(#[source] std::io::Error),
}
