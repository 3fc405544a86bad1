// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Shared vocabulary of the cwtelemetry pipeline: the [`Unit`] catalog, the
//! datapoint shapes moving between stages, the outbound [`PutMetricData`]
//! request, and the [`FlushSink`]/[`MetricsSink`] contracts.

pub use crate::config::ConfigurationError;
pub use crate::datapoint::{
    AggregatedRecord, Datapoint, DatapointGroup, Dimensions, FlushBatch, FlushGroup, Point,
    RawPoint, TimedValue,
};
pub use crate::request::{Dimension, MetricDatum, PutMetricData};
pub use crate::sink::{FlushSink, FlushWait, MetricsSink, SinkError};
pub use crate::unit::Unit;
pub use crate::validate::{ValidationError, ValidationErrorBuilder};
pub use crate::value::{MetricValue, StatisticSet};

mod config;
pub mod datapoint;
pub mod request;
pub mod sink;
pub mod unit;
mod validate;
pub mod value;

/// Recording sinks for tests. This requires that the `test-util` feature be enabled.
#[cfg(feature = "test-util")]
pub mod test_util;
