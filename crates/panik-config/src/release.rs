// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Release naming for grouping reports by deploy.

use std::process::Command;

use tracing::debug;

/// Picks the release string reports are tagged with.
///
/// An explicit release always wins. Otherwise the release is
/// `<app_name>@<commit>` when both are known, and unset when either is
/// missing. `commit` is only called when it is needed.
pub fn derive_release<F>(explicit: Option<&str>, app_name: Option<&str>, commit: F) -> Option<String>
where
	F: FnOnce() -> Option<String>,
{
	if let Some(release) = explicit.filter(|r| !r.is_empty()) {
		return Some(release.to_string());
	}

	let app_name = app_name.filter(|name| !name.is_empty())?;
	let commit = commit().filter(|hash| !hash.is_empty())?;
	Some(format!("{app_name}@{commit}"))
}

/// Full hash of `HEAD` in the current working directory, if git knows it.
pub fn git_commit_hash() -> Option<String> {
	let output = match Command::new("git").args(["rev-parse", "HEAD"]).output() {
		Ok(output) => output,
		Err(e) => {
			debug!(error = %e, "git not available, release unknown");
			return None;
		}
	};

	if !output.status.success() {
		debug!(status = %output.status, "git rev-parse HEAD failed, release unknown");
		return None;
	}

	let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
	(!hash.is_empty()).then_some(hash)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn explicit_release_wins() {
		let release = derive_release(Some("api@1.4.0"), Some("api"), || {
			panic!("commit must not be resolved")
		});
		assert_eq!(release.as_deref(), Some("api@1.4.0"));
	}

	#[test]
	fn composes_app_and_commit() {
		let release = derive_release(None, Some("billing"), || Some("9f2c1e7".to_string()));
		assert_eq!(release.as_deref(), Some("billing@9f2c1e7"));
	}

	#[test]
	fn missing_commit_leaves_release_unset() {
		assert_eq!(derive_release(None, Some("billing"), || None), None);
	}

	#[test]
	fn missing_app_name_leaves_release_unset() {
		assert_eq!(
			derive_release(None, None, || Some("9f2c1e7".to_string())),
			None
		);
	}

	#[test]
	fn empty_explicit_release_is_ignored() {
		let release = derive_release(Some(""), Some("billing"), || Some("abc".to_string()));
		assert_eq!(release.as_deref(), Some("billing@abc"));
	}

	#[test]
	fn git_hash_is_trimmed_hex_when_known() {
		// None outside a checkout or without git.
		if let Some(hash) = git_commit_hash() {
			assert!(hash.len() >= 40, "unexpected hash {hash:?}");
			assert!(hash.chars().all(|c| c.is_ascii_hexdigit()), "unexpected hash {hash:?}");
		}
	}
}
