// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Choosing between the reporter-backed and console-only controllers.
//!
//! Remote reporting needs the `remote` feature compiled in and a DSN
//! configured. When either is missing the controller still exposes the
//! same operations, with reports going to the console only.

#[cfg(feature = "remote")]
use std::sync::Arc;

use panik_config::PanikConfig;
use tracing::warn;

#[cfg(feature = "remote")]
use crate::console::Console;
use crate::controller::{Panik, PanikBuilder};
use crate::error::Result;
use crate::options::ReportOptions;

/// Whether this build can report remotely.
pub const HAS_REPORTER: bool = cfg!(feature = "remote");

/// Builds a controller from the process environment.
pub fn from_env() -> Result<Panik> {
	from_config(&PanikConfig::from_env()?, ReportOptions::default())
}

/// Builds a controller from `config`, falling back to console-only.
pub fn from_config(config: &PanikConfig, options: ReportOptions) -> Result<Panik> {
	select(Panik::builder(), config, options).map(PanikBuilder::build)
}

/// Adds a reporter to `builder` when one is available, otherwise prints a
/// fallback warning through the builder's console.
pub fn select(builder: PanikBuilder, config: &PanikConfig, options: ReportOptions) -> Result<PanikBuilder> {
	#[cfg(feature = "remote")]
	if config.dsn.is_some() {
		return attach_remote(builder, config, options);
	}

	let dsn_set = config.dsn.is_some();
	builder.console.error(&format!(
		"Falling back to panik without remote reporting. DSN set? {dsn_set}; Has reporter? {HAS_REPORTER}"
	));
	warn!(dsn_set, has_reporter = HAS_REPORTER, "Remote reporting unavailable");

	Ok(builder.options(options))
}

/// Builds a reporter-backed controller. Fails when no DSN is configured.
#[cfg(feature = "remote")]
pub fn with_remote(config: &PanikConfig, options: ReportOptions) -> Result<Panik> {
	attach_remote(Panik::builder(), config, options).map(PanikBuilder::build)
}

/// Builds the HTTP reporter described by `config` and `options`.
///
/// Reports that fail to deliver are printed to `console`.
#[cfg(feature = "remote")]
pub fn remote_reporter(
	config: &PanikConfig,
	options: &ReportOptions,
	console: Arc<dyn Console>,
) -> Result<panik_report::HttpReporter> {
	use panik_report::{HttpReporter, SetupError};

	let dsn = config.dsn.as_ref().ok_or(SetupError::MissingDsn)?;
	let mut config = config.clone();
	if let Some(app_name) = &options.app_name {
		config.app_name = Some(app_name.clone());
	}

	let mut builder = HttpReporter::builder()
		.dsn(dsn.expose().as_str())
		.environment(config.environment.as_str())
		.app_name(config.app_name())
		.on_delivery_failure(move |event_id, e| {
			console.error(&format!("Failed to deliver event {event_id}: {e}"));
		});
	if let Some(release) = config.release(options.release.as_deref()) {
		builder = builder.release(release);
	}
	if let Some(server_name) = &config.server_name {
		builder = builder.server_name(server_name.as_str());
	}

	Ok(builder.build()?)
}

#[cfg(feature = "remote")]
fn attach_remote(builder: PanikBuilder, config: &PanikConfig, options: ReportOptions) -> Result<PanikBuilder> {
	let reporter = remote_reporter(config, &options, Arc::clone(&builder.console))?;
	Ok(builder.reporter(reporter).options(options))
}
