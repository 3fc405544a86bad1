// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Minute-bucket aggregation of decoded datapoint groups.
//!
//! Every point of a [`DatapointGroup`] is placed into the one-minute UTC
//! bucket that contains its timestamp. Points sharing namespace, metric name,
//! sorted dimension values and bucket end up in the same [`AggregatedRecord`],
//! whose value lists them in the order they were encountered.

use chrono::{DateTime, SecondsFormat, Utc};
use cwtelemetry_core::{
    AggregatedRecord, DatapointGroup, MetricValue, MetricsSink, SinkError,
    datapoint::{KEY_SEPARATOR, sorted_dimension_values},
};
use futures::future::try_join_all;
use hashbrown::HashMap;

use crate::dispatch::CloudWatchDispatcher;

const MINUTE_MILLIS: u64 = 60_000;

/// Start of the UTC minute containing `timestamp`, in epoch milliseconds.
pub fn minute_bucket(timestamp: u64) -> u64 {
    timestamp - timestamp % MINUTE_MILLIS
}

/// ISO-8601 rendering of an epoch-millis instant, e.g.
/// `2018-11-15T18:43:00.000Z`.
///
/// Returns `None` for instants chrono cannot represent.
pub fn iso_timestamp(epoch_millis: u64) -> Option<String> {
    let millis = i64::try_from(epoch_millis).ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Aggregated records of one namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceRecords {
    /// Target namespace.
    pub namespace: String,
    /// Records in first-seen bucket order.
    pub records: Vec<AggregatedRecord>,
}

/// Partition `groups` by namespace, in first-seen namespace order, and
/// aggregate each partition with [`aggregate_namespace`].
pub fn aggregate(groups: &[DatapointGroup]) -> Vec<NamespaceRecords> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut partitions: Vec<(&str, Vec<&DatapointGroup>)> = Vec::new();

    for group in groups {
        let slot = *index.entry(group.namespace.as_str()).or_insert_with(|| {
            partitions.push((group.namespace.as_str(), Vec::new()));
            partitions.len() - 1
        });
        partitions[slot].1.push(group);
    }

    partitions
        .into_iter()
        .map(|(namespace, groups)| NamespaceRecords {
            namespace: namespace.to_owned(),
            records: aggregate_namespace(groups),
        })
        .collect()
}

/// Aggregate groups that share a namespace into minute-bucket records.
///
/// The namespace is not part of the bucket identity, so callers mixing
/// namespaces here get them merged; use [`aggregate`] for mixed input.
pub fn aggregate_namespace<'a>(
    groups: impl IntoIterator<Item = &'a DatapointGroup>,
) -> Vec<AggregatedRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<(AggregatedRecord, Vec<f64>)> = Vec::new();

    for group in groups {
        let dimension_values = sorted_dimension_values(&group.dimensions);
        for point in &group.points {
            let bucket_start = minute_bucket(point.timestamp);
            let key = format!(
                "{name}{KEY_SEPARATOR}{bucket_start}{KEY_SEPARATOR}{dimension_values}",
                name = group.name,
            );
            let slot = *index.entry(key).or_insert_with(|| {
                buckets.push((record_for(group, bucket_start), Vec::new()));
                buckets.len() - 1
            });
            buckets[slot].1.push(point.value);
        }
    }

    buckets
        .into_iter()
        .map(|(mut record, values)| {
            record.value = MetricValue::Samples(values);
            record
        })
        .collect()
}

fn record_for(group: &DatapointGroup, bucket_start: u64) -> AggregatedRecord {
    AggregatedRecord {
        name: group.name.clone(),
        namespace: group.namespace.clone(),
        dimensions: group.dimensions.clone(),
        unit: group.unit,
        timestamp: iso_timestamp(bucket_start),
        value: MetricValue::Samples(Vec::new()),
    }
}

/// Aggregates decoded datapoint groups and dispatches the result.
#[derive(Debug, Clone)]
pub struct DatapointsProcessor<S> {
    dispatcher: CloudWatchDispatcher<S>,
}

impl<S: MetricsSink> DatapointsProcessor<S> {
    /// Process into `sink`.
    pub fn new(sink: S) -> Self {
        Self {
            dispatcher: CloudWatchDispatcher::new(sink),
        }
    }

    /// Aggregate `groups` and submit every namespace concurrently.
    ///
    /// Resolves once every namespace was submitted, or with the first
    /// failure. Failures have already been logged by the dispatcher.
    pub async fn process(&self, groups: &[DatapointGroup]) -> Result<(), SinkError> {
        let partitions = aggregate(groups);
        try_join_all(
            partitions
                .iter()
                .map(|p| self.dispatcher.submit(&p.namespace, &p.records)),
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;
    use cwtelemetry_core::{
        DatapointGroup, Dimensions, MetricValue, Point, Unit, test_util::recording_metrics_sink,
    };
    use rstest::rstest;

    use super::{DatapointsProcessor, aggregate, aggregate_namespace, iso_timestamp, minute_bucket};

    fn group(
        name: &str,
        namespace: &str,
        dimensions: &[(&str, &str)],
        points: &[(f64, u64)],
    ) -> DatapointGroup {
        DatapointGroup {
            name: name.into(),
            namespace: namespace.into(),
            dimensions: dimensions
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Dimensions>(),
            points: points
                .iter()
                .map(|&(value, timestamp)| Point { value, timestamp })
                .collect(),
            unit: Some(Unit::Count),
        }
    }

    #[rstest]
    #[case(1_542_307_422_079, 1_542_307_380_000)]
    #[case(1_542_307_380_000, 1_542_307_380_000)]
    #[case(1_542_307_439_999, 1_542_307_380_000)]
    #[case(1_542_307_441_025, 1_542_307_440_000)]
    fn truncates_to_minute(#[case] timestamp: u64, #[case] expected: u64) {
        check!(minute_bucket(timestamp) == expected);
    }

    #[test]
    fn iso_rendering() {
        check!(iso_timestamp(1_542_307_380_000).as_deref() == Some("2018-11-15T18:43:00.000Z"));
        check!(iso_timestamp(u64::MAX).is_none());
    }

    #[test]
    fn points_bucket_by_minute() {
        let records = aggregate_namespace(&[group(
            "eventCount",
            "ns",
            &[("customerId", "c1")],
            &[
                (1.0, 1_542_307_422_079),
                (2.0, 1_542_307_430_011),
                (3.0, 1_542_307_441_025),
            ],
        )]);

        check!(records.len() == 2);
        check!(records[0].timestamp.as_deref() == Some("2018-11-15T18:43:00.000Z"));
        check!(records[0].value == MetricValue::Samples(vec![1.0, 2.0]));
        check!(records[1].timestamp.as_deref() == Some("2018-11-15T18:44:00.000Z"));
        check!(records[1].value == MetricValue::Samples(vec![3.0]));
    }

    #[test]
    fn same_values_under_different_keys_merge() {
        let groups = [
            group("m", "ns", &[("customerId", "c1")], &[(1.0, 1_542_307_422_079)]),
            group("m", "ns", &[("accountId", "c1")], &[(2.0, 1_542_307_430_011)]),
        ];
        let records = aggregate_namespace(&groups);

        check!(records.len() == 1);
        check!(records[0].value == MetricValue::Samples(vec![1.0, 2.0]));
        check!(records[0].dimensions == groups[0].dimensions);
    }

    #[test]
    fn different_names_stay_apart() {
        let records = aggregate_namespace(&[
            group("a", "ns", &[("k", "v")], &[(1.0, 1_542_307_422_079)]),
            group("b", "ns", &[("k", "v")], &[(1.0, 1_542_307_422_079)]),
        ]);
        check!(records.len() == 2);
        check!(records[0].name == "a");
        check!(records[1].name == "b");
    }

    #[test]
    fn group_without_points_yields_nothing() {
        check!(aggregate_namespace(&[group("m", "ns", &[("k", "v")], &[])]).is_empty());
    }

    #[test]
    fn namespaces_partition_in_first_seen_order() {
        let partitions = aggregate(&[
            group("m", "b", &[("k", "v")], &[(1.0, 1_542_307_422_079)]),
            group("m", "a", &[("k", "v")], &[(2.0, 1_542_307_422_079)]),
            group("m", "b", &[("k", "v")], &[(3.0, 1_542_307_422_079)]),
        ]);

        check!(partitions.len() == 2);
        check!(partitions[0].namespace == "b");
        check!(partitions[0].records[0].value == MetricValue::Samples(vec![1.0, 3.0]));
        check!(partitions[1].namespace == "a");
        check!(partitions[1].records.iter().all(|r| r.namespace == "a"));
    }

    #[tokio::test]
    async fn single_group_is_submitted_once() {
        let recording = recording_metrics_sink();
        let processor = DatapointsProcessor::new(recording.sink);
        processor
            .process(&[group(
                "testMetric",
                "ns",
                &[("customerId", "c1")],
                &[(12345.0, 1_542_307_422_079)],
            )])
            .await
            .unwrap();

        let requests = recording.inspector.requests();
        check!(requests.len() == 1);
        check!(requests[0].namespace == "ns");
        let datum = &requests[0].metric_data[0];
        check!(datum.metric_name == "testMetric");
        check!(datum.timestamp.as_deref() == Some("2018-11-15T18:43:00.000Z"));
        let stats = datum.statistic_values.as_ref().unwrap();
        check!(stats.sum == 12345.0);
        check!(stats.sample_count == 1.0);
    }

    #[tokio::test]
    async fn each_namespace_gets_its_own_call() {
        let recording = recording_metrics_sink();
        let processor = DatapointsProcessor::new(recording.sink);
        processor
            .process(&[
                group("m", "ns1", &[("k", "v")], &[(1.0, 1_542_307_422_079)]),
                group("m", "ns2", &[("k", "v")], &[(1.0, 1_542_307_422_079)]),
            ])
            .await
            .unwrap();

        check!(recording.inspector.calls() == 2);
        check!(recording.inspector.requests_for("ns1").len() == 1);
        check!(recording.inspector.requests_for("ns2").len() == 1);
    }

    #[tokio::test]
    async fn failing_namespace_fails_the_whole_process() {
        let recording = recording_metrics_sink();
        recording.inspector.fail_namespace("ns2");
        let processor = DatapointsProcessor::new(recording.sink);
        let err = processor
            .process(&[
                group("m", "ns1", &[("k", "v")], &[(1.0, 1_542_307_422_079)]),
                group("m", "ns2", &[("k", "v")], &[(1.0, 1_542_307_422_079)]),
            ])
            .await
            .unwrap_err();
        check!(err.is_reported());
    }

    #[tokio::test]
    async fn nothing_to_process_makes_no_calls() {
        let recording = recording_metrics_sink();
        let processor = DatapointsProcessor::new(recording.sink);
        processor.process(&[]).await.unwrap();
        check!(recording.inspector.calls() == 0);
    }
}
