// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Blocking HTTP client with a consistent User-Agent header.

use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder};

/// Creates a blocking client builder with the panik User-Agent and `timeout`.
///
/// Blocking clients own a runtime of their own; build and drop them on a
/// plain thread, never inside an async context.
pub(crate) fn builder(timeout: Duration) -> ClientBuilder {
	Client::builder().user_agent(user_agent()).timeout(timeout)
}

/// Returns the panik User-Agent string.
///
/// Format: `panik/{os}-{arch}/{version}`
/// Example: `panik/linux-x86_64/0.1.0`
pub fn user_agent() -> String {
	format!(
		"panik/{}-{}/{}",
		std::env::consts::OS,
		std::env::consts::ARCH,
		env!("CARGO_PKG_VERSION")
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		assert!(ua.starts_with("panik/"));
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 3);
		assert_eq!(parts[0], "panik");
		assert_eq!(parts[2], env!("CARGO_PKG_VERSION"));
	}

	#[test]
	fn user_agent_includes_platform() {
		let ua = user_agent();
		assert!(ua.contains(std::env::consts::OS));
		assert!(ua.contains(std::env::consts::ARCH));
	}
}
