// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment keys understood by panik.

use tracing::debug;

use crate::env::{load_secret_with, SecretEnvError};
use crate::release::{derive_release, git_commit_hash};
use crate::secret::SecretString;

/// Remote backend DSN; `PANIK_DSN_FILE` is honored as well.
pub const DSN_VAR: &str = "PANIK_DSN";
pub const ENVIRONMENT_VAR: &str = "PANIK_ENVIRONMENT";
/// Application name sources, first non-empty wins.
pub const APP_NAME_VARS: [&str; 3] = ["PANIK_APP_NAME", "HEROKU_APP_NAME", "APP"];
/// Deploy commit sources, first non-empty wins; git is asked last.
pub const COMMIT_VARS: [&str; 2] = ["PANIK_COMMIT", "HEROKU_SLUG_COMMIT"];
/// Host identification sources, first non-empty wins.
pub const SERVER_NAME_VARS: [&str; 3] = ["PANIK_SERVER_NAME", "DYNO", "HOSTNAME"];

pub const DEFAULT_ENVIRONMENT: &str = "development";
/// Name used when no application name is configured. Never tagged.
pub const DEFAULT_APP_NAME: &str = "app";

/// Configuration read once at startup.
#[derive(Debug, Clone)]
pub struct PanikConfig {
	pub dsn: Option<SecretString>,
	pub environment: String,
	pub app_name: Option<String>,
	pub commit: Option<String>,
	pub server_name: Option<String>,
}

impl Default for PanikConfig {
	fn default() -> Self {
		Self {
			dsn: None,
			environment: DEFAULT_ENVIRONMENT.to_string(),
			app_name: None,
			commit: None,
			server_name: None,
		}
	}
}

impl PanikConfig {
	/// Reads the process environment.
	pub fn from_env() -> Result<Self, SecretEnvError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads configuration through `lookup`; empty values count as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, SecretEnvError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let first = |keys: &[&str]| {
			keys.iter()
				.find_map(|key| lookup(key).filter(|value| !value.is_empty()))
		};

		let config = Self {
			dsn: load_secret_with(DSN_VAR, &lookup)?,
			environment: first(&[ENVIRONMENT_VAR])
				.unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
			app_name: first(&APP_NAME_VARS),
			commit: first(&COMMIT_VARS),
			server_name: first(&SERVER_NAME_VARS),
		};

		debug!(
			dsn_set = config.dsn.is_some(),
			environment = %config.environment,
			app_name = ?config.app_name,
			server_name = ?config.server_name,
			"Loaded panik configuration"
		);

		Ok(config)
	}

	/// Configured application name, or [`DEFAULT_APP_NAME`].
	pub fn app_name(&self) -> &str {
		self.app_name.as_deref().unwrap_or(DEFAULT_APP_NAME)
	}

	/// Release for this process; asks git only when no commit is configured.
	pub fn release(&self, explicit: Option<&str>) -> Option<String> {
		derive_release(explicit, self.app_name.as_deref(), || {
			self.commit.clone().or_else(git_commit_hash)
		})
	}
}
