// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! DSN parsing.

use std::fmt;
use std::str::FromStr;

use panik_config::{SecretString, REDACTED};
use url::Url;

use crate::error::DsnError;

/// Path of the capture endpoint, relative to the DSN's base path.
const CAPTURE_PATH: &str = "api/crash/capture";

/// Where and as whom reports are sent.
///
/// Parsed from `scheme://<public_key>@host[:port][/prefix]/<project_id>`.
/// The public key is kept as a secret; `Display` redacts it.
#[derive(Clone, PartialEq, Eq)]
pub struct Dsn {
	public_key: SecretString,
	project_id: String,
	base: String,
}

impl Dsn {
	pub fn public_key(&self) -> &SecretString {
		&self.public_key
	}

	pub fn project_id(&self) -> &str {
		&self.project_id
	}

	/// Full URL reports are POSTed to.
	pub fn capture_url(&self) -> String {
		format!("{}/{CAPTURE_PATH}", self.base)
	}
}

impl FromStr for Dsn {
	type Err = DsnError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let url = Url::parse(s.trim())?;

		match url.scheme() {
			"http" | "https" => {}
			other => return Err(DsnError::UnsupportedScheme(other.to_string())),
		}

		if url.username().is_empty() {
			return Err(DsnError::MissingPublicKey);
		}
		let host = url.host_str().ok_or(DsnError::MissingHost)?;

		let mut segments: Vec<&str> = url
			.path_segments()
			.map(|segments| segments.filter(|s| !s.is_empty()).collect())
			.unwrap_or_default();
		let project_id = segments.pop().ok_or(DsnError::MissingProjectId)?.to_string();

		let mut base = format!("{}://{host}", url.scheme());
		if let Some(port) = url.port() {
			base.push_str(&format!(":{port}"));
		}
		for segment in segments {
			base.push('/');
			base.push_str(segment);
		}

		Ok(Self {
			public_key: SecretString::new(url.username().to_string()),
			project_id,
			base,
		})
	}
}

impl fmt::Display for Dsn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (scheme, rest) = self.base.split_once("://").unwrap_or(("", &self.base));
		write!(f, "{scheme}://{REDACTED}@{rest}/{}", self.project_id)
	}
}

impl fmt::Debug for Dsn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Dsn").field(&self.to_string()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_standard_dsn() {
		let dsn: Dsn = "https://pk_live@crash.example.com/proj_123".parse().unwrap();
		assert_eq!(dsn.public_key().expose(), "pk_live");
		assert_eq!(dsn.project_id(), "proj_123");
		assert_eq!(
			dsn.capture_url(),
			"https://crash.example.com/api/crash/capture"
		);
	}

	#[test]
	fn keeps_port_and_prefix() {
		let dsn: Dsn = "http://pk@127.0.0.1:8080/crash/proj_9/".parse().unwrap();
		assert_eq!(dsn.project_id(), "proj_9");
		assert_eq!(dsn.capture_url(), "http://127.0.0.1:8080/crash/api/crash/capture");
	}

	#[test]
	fn display_and_debug_redact_key() {
		let dsn: Dsn = "https://pk_live@crash.example.com/proj_123".parse().unwrap();
		assert_eq!(dsn.to_string(), "https://[REDACTED]@crash.example.com/proj_123");
		assert!(!format!("{dsn:?}").contains("pk_live"));
	}

	#[test]
	fn rejects_missing_key() {
		assert_eq!(
			"https://crash.example.com/proj_123".parse::<Dsn>(),
			Err(DsnError::MissingPublicKey)
		);
	}

	#[test]
	fn rejects_missing_project() {
		assert_eq!(
			"https://pk@crash.example.com/".parse::<Dsn>(),
			Err(DsnError::MissingProjectId)
		);
	}

	#[test]
	fn rejects_other_schemes() {
		assert_eq!(
			"ftp://pk@crash.example.com/proj".parse::<Dsn>(),
			Err(DsnError::UnsupportedScheme("ftp".to_string()))
		);
	}

	#[test]
	fn rejects_garbage() {
		assert!(matches!(
			"not a dsn".parse::<Dsn>(),
			Err(DsnError::InvalidUrl(_))
		));
	}
}
