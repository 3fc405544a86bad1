// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Outbound request shape, mirroring CloudWatch `PutMetricData`.

use serde::Serialize;

use crate::{AggregatedRecord, MetricValue, StatisticSet, Unit};

/// One `PutMetricData` call: a namespace and a bounded list of datums.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutMetricData {
    /// Target namespace.
    pub namespace: String,
    /// Metrics in this call.
    pub metric_data: Vec<MetricDatum>,
}

/// A `Name`/`Value` dimension pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    /// Dimension name.
    pub name: String,
    /// Dimension value.
    pub value: String,
}

/// One metric inside a [`PutMetricData`] call.
///
/// Exactly one of `value` and `statistic_values` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricDatum {
    /// Metric name.
    pub metric_name: String,
    /// Dimension pairs, ordered by name.
    pub dimensions: Vec<Dimension>,
    /// ISO-8601 timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Scalar value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Statistics over a sample list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistic_values: Option<StatisticSet>,
    /// Unit name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl MetricDatum {
    /// Convert an aggregated record into a datum.
    ///
    /// Sample lists are replaced by their statistics. Returns `None` for an
    /// empty sample list, which has no statistics to send.
    pub fn from_record(record: &AggregatedRecord) -> Option<Self> {
        let (value, statistic_values) = match &record.value {
            MetricValue::Scalar(v) => (Some(*v), None),
            MetricValue::Samples(samples) => (None, Some(StatisticSet::from_samples(samples)?)),
        };
        Some(Self {
            metric_name: record.name.clone(),
            dimensions: record
                .dimensions
                .iter()
                .map(|(name, value)| Dimension {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
            timestamp: record.timestamp.clone(),
            value,
            statistic_values,
            unit: record.unit,
        })
    }
}
