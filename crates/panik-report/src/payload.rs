// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire format of the capture endpoint.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use panik_core::{EventId, Level, NormalizedError, ReportEvent};
use serde::{Deserialize, Serialize};

use crate::backtrace::parse_frames;

/// SDK version for identification.
const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
/// SDK name for identification.
const SDK_NAME: &str = "panik-rust";

/// Fields shared by every report from one reporter.
#[derive(Debug, Clone)]
pub(crate) struct EventContext {
	pub project_id: String,
	pub environment: String,
	pub release: Option<String>,
	pub server_name: Option<String>,
	/// Tagged as `app` unless it is the default name.
	pub app_name: Option<String>,
}

impl EventContext {
	fn tags(&self) -> BTreeMap<String, String> {
		let mut tags = BTreeMap::new();
		tags.insert("sdk.name".to_string(), SDK_NAME.to_string());
		tags.insert("sdk.version".to_string(), SDK_VERSION.to_string());
		if let Some(app) = self
			.app_name
			.as_deref()
			.filter(|name| *name != panik_config::DEFAULT_APP_NAME)
		{
			tags.insert("app".to_string(), app.to_string());
		}
		tags
	}

	fn request(
		&self,
		event_id: EventId,
		exception_type: String,
		exception_value: String,
		level: Level,
		timestamp: DateTime<Utc>,
	) -> CaptureRequest {
		CaptureRequest {
			project_id: self.project_id.clone(),
			event_id: event_id.to_string(),
			exception_type,
			exception_value,
			level: level.to_string(),
			stacktrace: CaptureStacktrace::default(),
			environment: Some(self.environment.clone()),
			platform: Some("rust".to_string()),
			release: self.release.clone(),
			server_name: self.server_name.clone(),
			tags: self.tags(),
			extra: serde_json::Value::Null,
			timestamp: Some(timestamp.to_rfc3339()),
		}
	}
}

/// Request payload for capturing a crash event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CaptureRequest {
	pub project_id: String,
	pub event_id: String,
	pub exception_type: String,
	pub exception_value: String,
	pub level: String,
	pub stacktrace: CaptureStacktrace,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub platform: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub release: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub server_name: Option<String>,
	#[serde(default)]
	pub tags: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
	pub extra: serde_json::Value,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<String>,
}

impl CaptureRequest {
	/// An error headed for exit, reported at fatal level.
	pub fn from_error(context: &EventContext, event_id: EventId, error: &NormalizedError) -> Self {
		let mut request = context.request(
			event_id,
			error.kind.clone(),
			error.message.clone(),
			Level::Fatal,
			Utc::now(),
		);
		if let Some(stack) = &error.stack {
			request.stacktrace.frames = parse_frames(stack);
		}
		if let Some(data) = &error.data {
			request.extra = serde_json::json!({ "data": data });
		}
		request
	}

	pub fn from_message(context: &EventContext, event_id: EventId, message: &str) -> Self {
		context.request(
			event_id,
			"message".to_string(),
			message.to_string(),
			Level::Info,
			Utc::now(),
		)
	}

	/// A structured event; its tags are merged over the reporter's.
	pub fn from_event(context: &EventContext, event_id: EventId, event: &ReportEvent) -> Self {
		let mut request = context.request(
			event_id,
			"event".to_string(),
			event.message.clone().unwrap_or_default(),
			event.level,
			event.timestamp,
		);
		request
			.tags
			.extend(event.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
		request.extra = event.extra.clone();
		request
	}
}

/// Stacktrace in capture request format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct CaptureStacktrace {
	pub frames: Vec<CaptureFrame>,
}

/// Frame in capture request format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CaptureFrame {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub function: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub module: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub filename: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub lineno: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub colno: Option<u32>,
	#[serde(default)]
	pub in_app: bool,
}
