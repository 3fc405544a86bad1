use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};

use assert_json_diff::assert_json_eq;
use assert2::check;
use cwtelemetry::logging::{self, DATAPOINTS_MESSAGE};
use cwtelemetry::{DatapointsCollector, Handler, METRIC_COUNT_LIMIT, TracingFlushSink};
use cwtelemetry_core::test_util::recording_metrics_sink;
use cwtelemetry_core::unit::NegativeScale;
use cwtelemetry_core::{Datapoint, Unit};
use cwtelemetry_timesource::{TimeSource, fakes::StaticTimeSource};
use serde_json::json;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct LogLines(Arc<Mutex<Vec<u8>>>);

impl LogLines {
    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl std::io::Write for LogLines {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogLines {
    type Writer = LogLines;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Wraps log messages the way a CloudWatch Logs subscription delivers them.
fn logs_payload(messages: &[String]) -> Vec<u8> {
    let events: Vec<_> = messages
        .iter()
        .enumerate()
        .map(|(i, message)| json!({"id": i.to_string(), "timestamp": 0, "message": message}))
        .collect();
    serde_json::to_vec(&json!({
        "messageType": "DATA_MESSAGE",
        "owner": "123456789012",
        "logGroup": "/aws/lambda/checkout",
        "logStream": "2018/11/15/[$LATEST]abcdef",
        "subscriptionFilters": ["cw-telemetry"],
        "logEvents": events,
    }))
    .unwrap()
}

#[tokio::test]
async fn logged_batches_reach_the_metrics_sink() {
    let log = LogLines::default();
    let _guard = tracing::subscriber::set_default(logging::subscriber("info", log.clone()));

    let collector = DatapointsCollector::builder()
        .namespace("checkout")
        .time_source(TimeSource::custom(StaticTimeSource::at_time(
            UNIX_EPOCH + Duration::from_millis(1_542_307_422_079),
        )))
        .build(TracingFlushSink)
        .unwrap();

    collector
        .add([
            Datapoint::new("eventCount", 1.0)
                .dimension("eventName", "LoginEvent")
                .unit(Unit::Count),
            Datapoint::new("eventCount", 1.0)
                .dimension("eventName", "LoginEvent")
                .unit(Unit::Count),
        ])
        .add([Datapoint::new("processingTime", 250.0)
            .dimension("eventName", "LoginEvent")
            .unit(Unit::Second(NegativeScale::Milli))]);
    collector.flush().await;

    let lines: Vec<String> = log
        .lines()
        .into_iter()
        .filter(|line| line.contains(DATAPOINTS_MESSAGE))
        .collect();
    check!(lines.len() == 1);
    let payload = logs_payload(&lines);

    let recording = recording_metrics_sink();
    Handler::new(recording.sink)
        .handle(&[payload])
        .await
        .unwrap();

    let requests = recording.inspector.requests();
    check!(requests.len() == 1);
    assert_json_eq!(
        serde_json::to_value(&requests[0]).unwrap(),
        json!({
            "Namespace": "checkout",
            "MetricData": [
                {
                    "MetricName": "eventCount",
                    "Dimensions": [{"Name": "eventName", "Value": "LoginEvent"}],
                    "Timestamp": "2018-11-15T18:43:00.000Z",
                    "StatisticValues": {
                        "Minimum": 1.0,
                        "Maximum": 1.0,
                        "SampleCount": 2.0,
                        "Sum": 2.0
                    },
                    "Unit": "Count"
                },
                {
                    "MetricName": "processingTime",
                    "Dimensions": [{"Name": "eventName", "Value": "LoginEvent"}],
                    "Timestamp": "2018-11-15T18:43:00.000Z",
                    "StatisticValues": {
                        "Minimum": 250.0,
                        "Maximum": 250.0,
                        "SampleCount": 1.0,
                        "Sum": 250.0
                    },
                    "Unit": "Milliseconds"
                }
            ]
        })
    );
}

#[tokio::test]
async fn single_group_is_sent_as_one_minute_record() {
    let message = json!({"datapoints": {
        "name": "testMetric",
        "namespace": "ns",
        "dimensions": {"customerId": "c1"},
        "points": [{"value": 12345, "timestamp": 1_542_307_422_079u64}],
        "unit": "Count",
    }})
    .to_string();

    let recording = recording_metrics_sink();
    Handler::new(recording.sink)
        .handle(&[logs_payload(&[message])])
        .await
        .unwrap();

    let requests = recording.inspector.requests_for("ns");
    check!(requests.len() == 1);
    assert_json_eq!(
        serde_json::to_value(&requests[0].metric_data).unwrap(),
        json!([{
            "MetricName": "testMetric",
            "Dimensions": [{"Name": "customerId", "Value": "c1"}],
            "Timestamp": "2018-11-15T18:43:00.000Z",
            "StatisticValues": {
                "Minimum": 12345.0,
                "Maximum": 12345.0,
                "SampleCount": 1.0,
                "Sum": 12345.0
            },
            "Unit": "Count"
        }])
    );
}

#[tokio::test]
async fn twenty_one_metrics_take_two_calls() {
    let groups: Vec<_> = (0..21)
        .map(|i| {
            json!({
                "name": format!("metric{i}"),
                "namespace": "ns",
                "dimensions": {"customerId": "c1"},
                "points": [{"value": 1, "timestamp": 1_542_307_422_079u64}],
            })
        })
        .collect();
    let message = json!({ "datapoints": groups }).to_string();

    let recording = recording_metrics_sink();
    Handler::new(recording.sink)
        .handle(&[logs_payload(&[message])])
        .await
        .unwrap();

    let sizes: Vec<_> = recording
        .inspector
        .requests()
        .iter()
        .map(|r| r.metric_data.len())
        .collect();
    check!(sizes == vec![METRIC_COUNT_LIMIT, 1]);
}

#[tokio::test]
async fn minutes_and_namespaces_split_records() {
    let message = json!({"datapoints": [
        {
            "name": "latency",
            "namespace": "a",
            "dimensions": {"route": "/login"},
            "points": [
                {"value": 1, "timestamp": 1_542_307_422_079u64},
                {"value": 2, "timestamp": 1_542_307_430_011u64},
                {"value": 3, "timestamp": 1_542_307_441_025u64}
            ]
        },
        {
            "name": "latency",
            "namespace": "b",
            "dimensions": {"path": "/login"},
            "points": [{"value": 4, "timestamp": 1_542_307_422_079u64}]
        }
    ]})
    .to_string();

    let recording = recording_metrics_sink();
    Handler::new(recording.sink)
        .handle(&[logs_payload(&[message])])
        .await
        .unwrap();

    check!(recording.inspector.calls() == 2);
    let a = recording.inspector.requests_for("a");
    let timestamps: Vec<_> = a[0]
        .metric_data
        .iter()
        .map(|d| d.timestamp.clone().unwrap())
        .collect();
    check!(timestamps == vec!["2018-11-15T18:43:00.000Z", "2018-11-15T18:44:00.000Z"]);
    check!(recording.inspector.requests_for("b")[0].metric_data.len() == 1);
}
