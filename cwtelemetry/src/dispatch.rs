// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Submission of aggregated records to a [`MetricsSink`].

use cwtelemetry_core::{AggregatedRecord, MetricDatum, MetricsSink, PutMetricData, SinkError};
use futures::future::try_join_all;

/// Most metrics CloudWatch accepts in one `PutMetricData` call.
pub const METRIC_COUNT_LIMIT: usize = 20;

/// Turns aggregated records into `PutMetricData` calls of at most
/// [`METRIC_COUNT_LIMIT`] metrics each.
#[derive(Debug, Clone)]
pub struct CloudWatchDispatcher<S> {
    sink: S,
}

impl<S: MetricsSink> CloudWatchDispatcher<S> {
    /// Dispatch through `sink`.
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Send `records` to `namespace`.
    ///
    /// Records are split into chunks of [`METRIC_COUNT_LIMIT`] and all chunks
    /// are sent concurrently. Resolves once every call succeeded, or with the
    /// first failure. A failure is logged here and marked as reported, so
    /// callers should not log it again. No records means no call.
    ///
    /// Records whose value is an empty sample list carry nothing to send and
    /// are skipped with a warning.
    pub async fn submit(
        &self,
        namespace: &str,
        records: &[AggregatedRecord],
    ) -> Result<(), SinkError> {
        let calls = records
            .chunks(METRIC_COUNT_LIMIT)
            .map(|chunk| PutMetricData {
                namespace: namespace.to_owned(),
                metric_data: chunk.iter().filter_map(to_datum).collect(),
            })
            .filter(|request| !request.metric_data.is_empty())
            .map(|request| self.put(request));

        try_join_all(calls).await.map(|_| ())
    }

    async fn put(&self, request: PutMetricData) -> Result<(), SinkError> {
        let namespace = request.namespace.clone();
        let metrics: Vec<String> = request
            .metric_data
            .iter()
            .map(|datum| datum.metric_name.clone())
            .collect();
        tracing::debug!(%namespace, ?metrics, "sending metrics");

        self.sink.put_metric_data(request).await.inspect_err(|err| {
            tracing::error!(%err, %namespace, ?metrics, "failed to send metrics");
            err.mark_reported();
        })
    }
}

fn to_datum(record: &AggregatedRecord) -> Option<MetricDatum> {
    let datum = MetricDatum::from_record(record);
    if datum.is_none() {
        tracing::warn!(
            name = %record.name,
            namespace = %record.namespace,
            "skipping metric without samples"
        );
    }
    datum
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;
    use assert2::check;
    use cwtelemetry_core::{
        AggregatedRecord, Dimensions, MetricValue, Unit, test_util::recording_metrics_sink,
    };
    use serde_json::json;

    use super::{CloudWatchDispatcher, METRIC_COUNT_LIMIT};

    fn record(name: &str, value: MetricValue) -> AggregatedRecord {
        AggregatedRecord {
            name: name.into(),
            namespace: "ns".into(),
            dimensions: Dimensions::from([("customerId".to_string(), "c1".to_string())]),
            unit: Some(Unit::Count),
            timestamp: Some("2018-11-15T18:43:00.000Z".into()),
            value,
        }
    }

    #[tokio::test]
    async fn no_records_no_calls() {
        let recording = recording_metrics_sink();
        let dispatcher = CloudWatchDispatcher::new(recording.sink);
        dispatcher.submit("ns", &[]).await.unwrap();
        check!(recording.inspector.calls() == 0);
    }

    #[tokio::test]
    async fn chunks_at_the_metric_limit() {
        let recording = recording_metrics_sink();
        let dispatcher = CloudWatchDispatcher::new(recording.sink);
        let records: Vec<_> = (0..21)
            .map(|i| record(&format!("metric{i}"), MetricValue::Scalar(i as f64)))
            .collect();

        dispatcher.submit("ns", &records).await.unwrap();

        let requests = recording.inspector.requests();
        check!(requests.len() == 2);
        check!(requests[0].metric_data.len() == METRIC_COUNT_LIMIT);
        check!(requests[1].metric_data.len() == 1);
        check!(requests[1].metric_data[0].metric_name == "metric20");
        check!(requests.iter().all(|r| r.namespace == "ns"));
    }

    #[tokio::test]
    async fn sample_lists_are_sent_as_statistics() {
        let recording = recording_metrics_sink();
        let dispatcher = CloudWatchDispatcher::new(recording.sink);
        dispatcher
            .submit(
                "ns",
                &[record(
                    "testMetric",
                    MetricValue::Samples(vec![1.0, 2.0, 3.0, 4.0, 5.0]),
                )],
            )
            .await
            .unwrap();

        let requests = recording.inspector.requests();
        assert_json_eq!(
            serde_json::to_value(&requests[0]).unwrap(),
            json!({
                "Namespace": "ns",
                "MetricData": [{
                    "MetricName": "testMetric",
                    "Dimensions": [{"Name": "customerId", "Value": "c1"}],
                    "Timestamp": "2018-11-15T18:43:00.000Z",
                    "StatisticValues": {
                        "Minimum": 1.0,
                        "Maximum": 5.0,
                        "SampleCount": 5.0,
                        "Sum": 15.0
                    },
                    "Unit": "Count"
                }]
            })
        );
    }

    #[tokio::test]
    async fn absent_timestamp_and_unit_are_omitted() {
        let recording = recording_metrics_sink();
        let dispatcher = CloudWatchDispatcher::new(recording.sink);
        let mut rec = record("m", MetricValue::Scalar(2.0));
        rec.timestamp = None;
        rec.unit = None;
        dispatcher.submit("ns", &[rec]).await.unwrap();

        let value = serde_json::to_value(&recording.inspector.requests()[0]).unwrap();
        let datum = &value["MetricData"][0];
        check!(datum.get("Timestamp").is_none());
        check!(datum.get("Unit").is_none());
        check!(datum.get("StatisticValues").is_none());
        check!(datum["Value"] == json!(2.0));
    }

    #[tokio::test]
    async fn failure_is_returned_and_marked_reported() {
        let recording = recording_metrics_sink();
        recording.inspector.fail_call(2);
        let dispatcher = CloudWatchDispatcher::new(recording.sink);
        let records: Vec<_> = (0..45)
            .map(|i| record(&format!("metric{i}"), MetricValue::Scalar(1.0)))
            .collect();

        let err = dispatcher.submit("ns", &records).await.unwrap_err();
        check!(err.is_reported());
        check!(recording.inspector.calls() == 3);
        check!(recording.inspector.requests().len() == 2);
    }

    #[tokio::test]
    async fn empty_sample_lists_are_skipped() {
        let recording = recording_metrics_sink();
        let dispatcher = CloudWatchDispatcher::new(recording.sink);
        dispatcher
            .submit("ns", &[record("m", MetricValue::Samples(vec![]))])
            .await
            .unwrap();
        check!(recording.inspector.calls() == 0);
    }
}
