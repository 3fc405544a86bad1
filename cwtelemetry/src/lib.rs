// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Aggregation and batching of CloudWatch metrics.
//!
//! The crate has two independent halves.
//!
//! On the producing side, a [`DatapointsCollector`] buffers datapoints inside
//! an application and periodically (or on request) flushes them, grouped by
//! metric identity and split into bounded chunks, to a
//! [`FlushSink`](cwtelemetry_core::FlushSink). [`TracingFlushSink`] writes
//! each batch as a log line.
//!
//! On the consuming side, a [`Handler`] takes the CloudWatch Logs payloads
//! those log lines end up in, decodes and validates the datapoints they
//! carry, re-aggregates them into one-minute buckets and sends the result
//! through a [`MetricsSink`](cwtelemetry_core::MetricsSink) in
//! `PutMetricData`-sized calls.
//!
//! ```
//! # use cwtelemetry::{DatapointsCollector, TracingFlushSink};
//! # use cwtelemetry_core::{Datapoint, Unit};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let collector = DatapointsCollector::builder()
//!     .namespace("checkout")
//!     .auto(true)
//!     .build(TracingFlushSink)
//!     .unwrap();
//!
//! collector.add([Datapoint::new("orderPlaced", 1.0)
//!     .dimension("region", "eu-west-1")
//!     .unit(Unit::Count)]);
//! collector.stop().await;
//! # }
//! ```

pub mod batch;
pub mod collector;
pub mod config;
pub mod decode;
pub mod dispatch;
pub mod handler;
pub mod logging;
pub mod processor;

pub use collector::{CollectorBuilder, DatapointsCollector};
pub use config::{CollectorConfig, Config};
pub use decode::{DecodeError, decode_log_payload};
pub use dispatch::{CloudWatchDispatcher, METRIC_COUNT_LIMIT};
pub use handler::{Handler, HandlerError};
pub use logging::TracingFlushSink;
pub use processor::{DatapointsProcessor, aggregate, aggregate_namespace};
