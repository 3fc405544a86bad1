// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Process logging and the log-line flush sink.
//!
//! Logs are written one JSON document per line, so that a line carrying a
//! flushed batch can be read back by [`decode_message`](crate::decode::decode_message)
//! once it reaches CloudWatch Logs:
//!
//! ```json
//! {"level":"INFO","message":"datapoints for cw-telemetry","datapoints":[...],...}
//! ```

use std::fmt;

use chrono::{SecondsFormat, Utc};
use cwtelemetry_core::{FlushBatch, FlushSink, FlushWait};
use serde_json::{Map, Value};
use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    EnvFilter,
    fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter, format},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Message attached to every flushed batch by [`TracingFlushSink`].
pub const DATAPOINTS_MESSAGE: &str = "datapoints for cw-telemetry";

/// Install a global JSON-lines subscriber writing to stdout, filtered by
/// `level` (any [`EnvFilter`] directive).
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init(level: &str) -> bool {
    subscriber(level, std::io::stdout).try_init().is_ok()
}

/// A JSON-lines subscriber filtered by `level` and writing to `writer`.
pub fn subscriber<W>(level: &str, writer: W) -> impl Subscriber + Send + Sync + use<W>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(writer)
        .event_format(JsonLines)
        .finish()
}

/// Formats every event as one JSON object per line.
///
/// The object holds `timestamp`, `level`, `target` and every event field,
/// the message included. Numbers and booleans stay typed. A string field
/// holding a JSON object or array is embedded as JSON rather than as a
/// string.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLines;

impl<S, N> FormatEvent<S, N> for JsonLines
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let mut line = Map::new();
        line.insert(
            "timestamp".to_owned(),
            Utc::now()
                .to_rfc3339_opts(SecondsFormat::Millis, true)
                .into(),
        );
        line.insert("level".to_owned(), metadata.level().to_string().into());
        line.insert("target".to_owned(), metadata.target().into());
        event.record(&mut JsonFields(&mut line));

        let json = serde_json::to_string(&line).map_err(|_| fmt::Error)?;
        writeln!(writer, "{json}")
    }
}

struct JsonFields<'a>(&'a mut Map<String, Value>);

impl JsonFields<'_> {
    fn insert(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_owned(), value);
    }
}

impl Visit for JsonFields<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.into());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        let value = match serde_json::from_str::<Value>(value) {
            Ok(nested @ (Value::Object(_) | Value::Array(_))) => nested,
            _ => Value::String(value.to_owned()),
        };
        self.insert(field, value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{value:?}")));
    }
}

/// A [`FlushSink`] that writes every batch as an `info` event.
///
/// The batch groups go into the `datapoints` field as a JSON array, so under
/// [`JsonLines`] the log line is a document with a `datapoints` entry, which
/// is the shape the decoder reads back in.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFlushSink;

impl FlushSink for TracingFlushSink {
    fn deliver(&self, batch: FlushBatch) -> FlushWait {
        match serde_json::to_string(&batch.datapoints) {
            Ok(json) => tracing::info!(datapoints = json.as_str(), "{DATAPOINTS_MESSAGE}"),
            Err(err) => tracing::error!(?err, "couldn't serialize datapoints"),
        }
        FlushWait::ready()
    }
}
