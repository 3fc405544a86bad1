// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Decoding of CloudWatch Logs subscription payloads into validated
//! [`DatapointGroup`]s.
//!
//! A payload looks like
//!
//! ```json
//! {
//!   "messageType": "DATA_MESSAGE",
//!   "logEvents": [{ "message": "{\"datapoints\": [...]}" }]
//! }
//! ```
//!
//! where every log event message is itself a JSON document carrying a
//! `datapoints` entry: one datapoint group or an array of them. Groups are
//! validated here and nowhere else.

use std::fmt;

use cwtelemetry_core::{DatapointGroup, ValidationError};
use serde::Deserialize;
use serde_json::Value;

/// `messageType` of payloads that carry log events.
pub const DATA_MESSAGE: &str = "DATA_MESSAGE";

/// A payload could not be turned into datapoint groups.
#[derive(Debug)]
pub enum DecodeError {
    /// The payload or one of its messages is not the expected JSON.
    Json(serde_json::Error),
    /// A message carried datapoints that failed validation.
    Validation(ValidationError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "malformed payload: {err}"),
            Self::Validation(err) => write!(f, "invalid datapoints: {err}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Validation(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<ValidationError> for DecodeError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogsPayload {
    #[serde(default)]
    message_type: Option<String>,
    #[serde(default)]
    log_events: Option<Value>,
}

#[derive(Deserialize)]
struct LogEvent {
    message: String,
}

/// Decode one CloudWatch Logs payload.
///
/// Payloads that are not [`DATA_MESSAGE`]s, or have no `messageType` at all,
/// carry no datapoints. A `DATA_MESSAGE` without a `logEvents` array and log
/// events without `datapoints` are skipped with a warning. Any malformed
/// message or invalid datapoint group fails the whole payload.
pub fn decode_log_payload(payload: &[u8]) -> Result<Vec<DatapointGroup>, DecodeError> {
    let parsed: LogsPayload = serde_json::from_slice(payload)?;
    tracing::debug!(message_type = ?parsed.message_type, "parsed log payload");
    if parsed.message_type.as_deref() != Some(DATA_MESSAGE) {
        return Ok(Vec::new());
    }

    let events = match parsed.log_events {
        Some(events @ Value::Array(_)) => events,
        _ => {
            tracing::warn!("payload does not contain an array of log events");
            return Ok(Vec::new());
        }
    };

    let mut groups = Vec::new();
    for event in Vec::<LogEvent>::deserialize(events)? {
        groups.extend(decode_message(&event.message)?);
    }
    Ok(groups)
}

/// Decode the `datapoints` carried by one log event message.
///
/// A message without `datapoints` yields nothing and is logged.
pub fn decode_message(message: &str) -> Result<Vec<DatapointGroup>, DecodeError> {
    let mut parsed: Value = serde_json::from_str(message)?;
    let datapoints = match parsed.get_mut("datapoints").map(Value::take) {
        None | Some(Value::Null) => {
            tracing::warn!(%message, "message does not contain datapoints");
            return Ok(Vec::new());
        }
        Some(Value::Array(items)) => items,
        Some(single) => vec![single],
    };
    Ok(validate_groups(datapoints)?)
}

fn validate_groups(items: Vec<Value>) -> Result<Vec<DatapointGroup>, ValidationError> {
    let mut errors = ValidationError::builder();
    let mut groups = Vec::with_capacity(items.len());

    for (i, item) in items.into_iter().enumerate() {
        let path = format!("datapoints[{i}]");
        match DatapointGroup::deserialize(item) {
            Ok(group) => match validate_group(&group) {
                Ok(()) => groups.push(group),
                Err(err) => {
                    errors.extend_mut(err.at(&path));
                }
            },
            Err(err) => {
                errors.extend_mut(ValidationError::invalid(err.to_string()).at(&path));
            }
        }
    }

    errors.build()?;
    Ok(groups)
}

fn validate_group(group: &DatapointGroup) -> Result<(), ValidationError> {
    let mut errors = ValidationError::builder();
    if group.name.is_empty() {
        errors.invalid_mut("name must not be empty");
    }
    if group.namespace.is_empty() {
        errors.invalid_mut("namespace must not be empty");
    }
    if group.dimensions.is_empty() {
        errors.invalid_mut("dimensions must not be empty");
    }
    for (i, point) in group.points.iter().enumerate() {
        if !point.value.is_finite() || point.value < 0.0 {
            errors.invalid_mut(format!(
                "points[{i}].value must be a non-negative number, got {}",
                point.value
            ));
        }
        if point.timestamp < 1 {
            errors.invalid_mut(format!("points[{i}].timestamp must be at least 1"));
        }
    }
    errors.build()
}
