// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crashes on purpose so panik's output can be seen end to end.
//!
//! ```text
//! cargo run -p panik --example crash -- panic
//! PANIK_DSN=https://pk@crash.example.com/proj_1 cargo run -p panik --example crash -- reject --code 28
//! ```

use std::sync::Arc;

use clap::{Parser, Subcommand};
use panik::{ErrorObject, Level, ReportEvent, ReportOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "crash", about = "Trigger a crash handled by panik")]
struct Args {
	/// Release to report under, instead of deriving one from git.
	#[arg(long, env = "PANIK_RELEASE")]
	release: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Panic on the main thread.
	Panic {
		#[arg(default_value = "ledger corrupted")]
		message: String,
	},
	/// Fail a spawned task.
	Reject {
		#[arg(default_value = "disk full")]
		message: String,
		/// Exit code carried by the error.
		#[arg(long)]
		code: Option<i32>,
	},
	/// Report a message and an event without exiting.
	Report {
		#[arg(default_value = "hello from panik")]
		message: String,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let args = Args::parse();

	let mut options = ReportOptions::new();
	if let Some(release) = args.release {
		options = options.with_release(release);
	}

	let config = panik::PanikConfig::from_env()?;
	let panik = Arc::new(panik::from_config(&config, options)?);
	let installation = Arc::clone(&panik).install()?;
	info!(reporter = panik.has_reporter(), "panik ready");

	match args.command {
		Command::Panic { message } => panic!("{message}"),
		Command::Reject { message, code } => {
			let mut error = ErrorObject::new(message);
			if let Some(code) = code {
				error = error.with_code(code);
			}
			let task = installation
				.rejections()
				.spawn(async move { Err::<(), _>(error) });
			task.await?;
			// The exit is scheduled; wait for it.
			tokio::time::sleep(panik.grace_period() * 2).await;
		}
		Command::Report { message } => {
			panik.report_message(&message);
			panik.report_event(
				&ReportEvent::new(message)
					.with_level(Level::Warning)
					.with_tag("source", "crash-example"),
			);
			installation.uninstall();
		}
	}

	Ok(())
}
