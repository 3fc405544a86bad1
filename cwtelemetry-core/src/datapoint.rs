// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Datapoint shapes as they move through the pipeline.
//!
//! - [`Datapoint`] is what producer code hands to a collector.
//! - [`RawPoint`] is a buffered datapoint, stamped with namespace and time.
//! - [`FlushGroup`]/[`FlushBatch`] is what a collector delivers on flush.
//! - [`DatapointGroup`] is the decoded, validated unit the processor consumes.
//! - [`AggregatedRecord`] is one minute-bucket of values ready for dispatch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{MetricValue, Unit};

/// Dimension name to dimension value.
pub type Dimensions = BTreeMap<String, String>;

/// Separator used when joining dimension values into grouping keys.
pub const KEY_SEPARATOR: &str = ":";

/// Joins the dimension *values* of `dimensions`, sorted lexicographically.
///
/// Dimension names do not participate, so `{a: "x"}` and `{b: "x"}` produce
/// the same string. Grouping keys built from this collide on purpose.
///
/// ```
/// # use cwtelemetry_core::datapoint::{Dimensions, sorted_dimension_values};
/// let dims = Dimensions::from([
///     ("region".to_string(), "us-east-1".to_string()),
///     ("customer".to_string(), "c1".to_string()),
/// ]);
/// assert_eq!(sorted_dimension_values(&dims), "c1:us-east-1");
/// ```
pub fn sorted_dimension_values(dimensions: &Dimensions) -> String {
    let mut values: Vec<&str> = dimensions.values().map(String::as_str).collect();
    values.sort_unstable();
    values.join(KEY_SEPARATOR)
}

/// A measurement as submitted by producer code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    /// Metric name.
    pub name: String,
    /// Dimension tags.
    pub dimensions: Dimensions,
    /// Observed value.
    pub value: MetricValue,
    /// Optional unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl Datapoint {
    /// Create a datapoint without dimensions or unit.
    pub fn new(name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        Self {
            name: name.into(),
            dimensions: Dimensions::new(),
            value: value.into(),
            unit: None,
        }
    }

    /// Add (or replace) a dimension.
    pub fn dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(name.into(), value.into());
        self
    }

    /// Set the unit.
    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// A buffered datapoint: the producer's fields plus the collector namespace and
/// the epoch-millis timestamp assigned when it was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    /// Metric name.
    pub name: String,
    /// Dimension tags.
    pub dimensions: Dimensions,
    /// Observed value.
    pub value: MetricValue,
    /// Optional unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    /// Namespace of the collector that buffered the point.
    pub namespace: String,
    /// Insertion time in epoch milliseconds.
    pub timestamp: u64,
}

impl RawPoint {
    /// Stamp `datapoint` with `namespace` and `timestamp`.
    pub fn stamp(datapoint: Datapoint, namespace: &str, timestamp: u64) -> Self {
        let Datapoint {
            name,
            dimensions,
            value,
            unit,
        } = datapoint;
        Self {
            name,
            dimensions,
            value,
            unit,
            namespace: namespace.to_owned(),
            timestamp,
        }
    }
}

/// One value at one instant inside a [`FlushGroup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedValue {
    /// Epoch milliseconds.
    pub timestamp: u64,
    /// Observed value.
    pub value: MetricValue,
}

/// Raw points of one flush chunk sharing a metric name and dimension values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlushGroup {
    /// Dimensions of the first point seen for this group.
    pub dimensions: Dimensions,
    /// Points in arrival order.
    pub points: Vec<TimedValue>,
    /// Metric name.
    pub name: String,
    /// Namespace of the collector.
    pub namespace: String,
    /// Unit of the first point seen, [`Unit::None`] if it had none.
    pub unit: Unit,
}

/// What a collector delivers to its flush sink, once per chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlushBatch {
    /// Groups in first-seen order.
    pub datapoints: Vec<FlushGroup>,
}

impl FlushBatch {
    /// Total number of raw points across all groups.
    pub fn point_count(&self) -> usize {
        self.datapoints.iter().map(|g| g.points.len()).sum()
    }
}

/// One raw sample inside a [`DatapointGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Point {
    /// Non-negative observed value.
    pub value: f64,
    /// Positive epoch milliseconds.
    pub timestamp: u64,
}

/// A decoded group of samples for one metric identity.
///
/// Instances reaching the processor have already been validated by the
/// decoder and are only ever read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatapointGroup {
    /// Metric name.
    pub name: String,
    /// Target namespace.
    pub namespace: String,
    /// Non-empty dimension tags.
    pub dimensions: Dimensions,
    /// Samples in arrival order.
    pub points: Vec<Point>,
    /// Optional unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

/// The values of one metric identity within one minute, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    /// Metric name.
    pub name: String,
    /// Target namespace.
    pub namespace: String,
    /// Dimension tags, forwarded as `Name`/`Value` pairs.
    pub dimensions: Dimensions,
    /// Optional unit, omitted from the outbound datum when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    /// ISO-8601 timestamp, omitted from the outbound datum when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Scalar value or samples in encounter order.
    pub value: MetricValue,
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::{DatapointGroup, Dimensions, sorted_dimension_values};

    #[test]
    fn dimension_values_ignore_names() {
        let a = Dimensions::from([("customerId".to_string(), "c1".to_string())]);
        let b = Dimensions::from([("accountId".to_string(), "c1".to_string())]);
        check!(sorted_dimension_values(&a) == sorted_dimension_values(&b));
    }

    #[test]
    fn dimension_values_are_sorted_by_value() {
        let dims = Dimensions::from([
            ("a".to_string(), "zeta".to_string()),
            ("b".to_string(), "alpha".to_string()),
            ("c".to_string(), "mu".to_string()),
        ]);
        check!(sorted_dimension_values(&dims) == "alpha:mu:zeta");
    }

    #[test]
    fn groups_reject_unknown_fields() {
        let json = r#"{"name":"m","namespace":"ns","dimensions":{"a":"b"},
            "points":[{"value":1,"timestamp":1,"extra":true}]}"#;
        check!(serde_json::from_str::<DatapointGroup>(json).is_err());
    }
}
