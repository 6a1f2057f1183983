// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Secret loading with the `VAR` / `VAR_FILE` convention.
//!
//! `VAR_FILE` wins over `VAR` so that a DSN mounted by Docker or Kubernetes
//! secrets overrides whatever leaked into the plain environment.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::secret::Secret;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Loads `var` from the process environment.
pub fn load_secret_env(var: &str) -> Result<Option<Secret<String>>, SecretEnvError> {
	load_secret_with(var, |key| std::env::var(key).ok())
}

/// Loads `var` through `lookup`, reading `{var}_FILE` first.
///
/// A single trailing newline is stripped from file contents. Empty values
/// count as unset.
pub fn load_secret_with<F>(var: &str, lookup: F) -> Result<Option<Secret<String>>, SecretEnvError>
where
	F: Fn(&str) -> Option<String>,
{
	let file_var = format!("{var}_FILE");

	if let Some(path) = lookup(&file_var) {
		if path.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(path);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;

		let value = content.strip_suffix('\n').unwrap_or(&content);
		return Ok((!value.is_empty()).then(|| Secret::new(value.to_string())));
	}

	Ok(lookup(var)
		.filter(|value| !value.is_empty())
		.map(Secret::new))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;
	use tempfile::NamedTempFile;

	fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn unset_is_none() {
		let secret = load_secret_with("PANIK_DSN", lookup_from(&[])).unwrap();
		assert!(secret.is_none());
	}

	#[test]
	fn empty_value_is_none() {
		let secret = load_secret_with("PANIK_DSN", lookup_from(&[("PANIK_DSN", "")])).unwrap();
		assert!(secret.is_none());
	}

	#[test]
	fn direct_value_is_used() {
		let secret = load_secret_with(
			"PANIK_DSN",
			lookup_from(&[("PANIK_DSN", "https://pk@crash.example.com/1")]),
		)
		.unwrap()
		.unwrap();
		assert_eq!(secret.expose(), "https://pk@crash.example.com/1");
	}

	#[test]
	fn file_wins_and_trailing_newline_is_stripped() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "https://from-file@crash.example.com/1").unwrap();
		let path = file.path().to_str().unwrap().to_string();

		let secret = load_secret_with(
			"PANIK_DSN",
			lookup_from(&[
				("PANIK_DSN", "https://from-env@crash.example.com/1"),
				("PANIK_DSN_FILE", path.as_str()),
			]),
		)
		.unwrap()
		.unwrap();
		assert_eq!(secret.expose(), "https://from-file@crash.example.com/1");
	}

	#[test]
	fn missing_file_is_an_error() {
		let result = load_secret_with(
			"PANIK_DSN",
			lookup_from(&[("PANIK_DSN_FILE", "/nonexistent/panik/dsn")]),
		);
		assert!(matches!(result, Err(SecretEnvError::Io { .. })));
	}

	#[test]
	fn empty_file_path_is_an_error() {
		let result = load_secret_with("PANIK_DSN", lookup_from(&[("PANIK_DSN_FILE", "")]));
		assert!(matches!(result, Err(SecretEnvError::EmptyPath { .. })));
	}

	#[test]
	fn process_env_lookup_sees_unset_var() {
		let secret = load_secret_env("PANIK_TEST_NEVER_SET_4711").unwrap();
		assert!(secret.is_none());
	}
}
