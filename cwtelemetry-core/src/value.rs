// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Metric values: a single observation or a list of raw samples.

use serde::{Deserialize, Serialize};

/// The value carried by a datapoint or an aggregated record.
///
/// Serializes untagged, so a scalar is a JSON number and a sample list is a
/// JSON array of numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// One observation, forwarded as-is.
    Scalar(f64),
    /// Raw samples in the order they were observed.
    Samples(Vec<f64>),
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        Self::Scalar(value as f64)
    }
}

impl From<Vec<f64>> for MetricValue {
    fn from(samples: Vec<f64>) -> Self {
        Self::Samples(samples)
    }
}

/// Minimum, maximum, count and sum over a sample list, in the shape of the
/// CloudWatch `StatisticValues` structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatisticSet {
    /// Smallest sample.
    pub minimum: f64,
    /// Largest sample.
    pub maximum: f64,
    /// Number of samples.
    pub sample_count: f64,
    /// Sum of all samples.
    pub sum: f64,
}

impl StatisticSet {
    /// Computes the statistics of `samples`; `None` if there are none.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let (&first, rest) = samples.split_first()?;
        let init = Self {
            minimum: first,
            maximum: first,
            sample_count: 1.0,
            sum: first,
        };
        Some(rest.iter().fold(init, |acc, &v| Self {
            minimum: acc.minimum.min(v),
            maximum: acc.maximum.max(v),
            sample_count: acc.sample_count + 1.0,
            sum: acc.sum + v,
        }))
    }
}
