// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Parsing rendered panic stacks into frames.

use rustc_demangle::demangle;

use crate::payload::CaptureFrame;

/// Marker line that precedes the frames of a rendered backtrace.
const BACKTRACE_MARKER: &str = "stack backtrace:";

/// Parses the backtrace section of a rendered panic stack.
///
/// Returns no frames when `stack` has no backtrace section, which is the
/// case for plain errors whose "stack" is just a message chain.
pub(crate) fn parse_frames(stack: &str) -> Vec<CaptureFrame> {
	let Some((_, trace)) = stack.split_once(BACKTRACE_MARKER) else {
		return Vec::new();
	};

	let mut frames: Vec<CaptureFrame> = Vec::new();
	for line in trace.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		if let Some(location) = line.strip_prefix("at ") {
			if let Some(frame) = frames.last_mut() {
				apply_location(frame, location);
			}
			continue;
		}

		if let Some(frame) = parse_frame_line(line) {
			frames.push(frame);
		}
	}

	frames
}

/// Parses `N: function` into a frame without location.
fn parse_frame_line(line: &str) -> Option<CaptureFrame> {
	let (index, function) = line.split_once(':')?;
	index.trim().parse::<u32>().ok()?;

	let function = function.trim();
	if function.is_empty() {
		return None;
	}

	let demangled = demangle(function).to_string();
	let module = demangled.rfind("::").map(|idx| demangled[..idx].to_string());
	let in_app = is_in_app_frame(&demangled);

	Some(CaptureFrame {
		function: Some(demangled),
		module,
		filename: None,
		lineno: None,
		colno: None,
		in_app,
	})
}

/// Applies `file:line:col` to `frame`. Missing parts stay unset.
fn apply_location(frame: &mut CaptureFrame, location: &str) {
	let mut parts = location.rsplitn(3, ':');
	let last = parts.next();
	let middle = parts.next();
	let rest = parts.next();

	match (rest, middle, last) {
		(Some(file), Some(line), Some(col)) => {
			frame.filename = Some(file.to_string());
			frame.lineno = line.parse().ok();
			frame.colno = col.parse().ok();
		}
		(None, Some(file), Some(line)) => {
			frame.filename = Some(file.to_string());
			frame.lineno = line.parse().ok();
		}
		_ => frame.filename = Some(location.to_string()),
	}
}

/// Whether a frame belongs to the application rather than the runtime.
///
/// panik's own frames are excluded so reports group on the caller.
fn is_in_app_frame(function: &str) -> bool {
	const SYSTEM_PREFIXES: &[&str] = &[
		"std::",
		"core::",
		"alloc::",
		"<std::",
		"<core::",
		"<alloc::",
		"tokio::",
		"<tokio::",
		"futures::",
		"<futures::",
		"tracing::",
		"<tracing::",
		"panik::",
		"<panik::",
		"panik_core::",
		"<panik_core::",
		"panik_report::",
		"<panik_report::",
		"rust_begin_unwind",
		"rust_panic",
		"__rust_",
		"_rust_",
	];

	const SYSTEM_CONTAINS: &[&str] = &[
		"::panic::",
		"::panicking::",
		"::thread::",
		"::rt::",
		"::runtime::",
		"::sys_common::",
	];

	!SYSTEM_PREFIXES
		.iter()
		.any(|prefix| function.starts_with(prefix))
		&& !SYSTEM_CONTAINS.iter().any(|part| function.contains(part))
}
