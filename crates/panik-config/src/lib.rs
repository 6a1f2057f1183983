// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration glue for panik.
//!
//! Everything here answers one question for the crash handler: is there a
//! remote backend to report to, and how should reports be tagged?
//!
//! - [`Secret<T>`]: keeps the DSN out of logs and debug output
//! - [`load_secret_env`]: reads `VAR` or `VAR_FILE`
//! - [`PanikConfig`]: the environment keys panik understands
//! - [`derive_release`]: `<app>@<commit>` release naming

pub mod env;
pub mod release;
pub mod secret;
pub mod settings;

pub use env::{load_secret_env, load_secret_with, SecretEnvError};
pub use release::{derive_release, git_commit_hash};
pub use secret::{Secret, SecretString, REDACTED};
pub use settings::{PanikConfig, DEFAULT_APP_NAME, DEFAULT_ENVIRONMENT};
