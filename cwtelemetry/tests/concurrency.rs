use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert2::check;
use cwtelemetry::{CloudWatchDispatcher, DatapointsProcessor};
use cwtelemetry_core::sink::SinkFuture;
use cwtelemetry_core::{
    AggregatedRecord, DatapointGroup, Dimensions, MetricValue, MetricsSink, Point, PutMetricData,
    Unit,
};
use tokio::time::Instant;

const CALL_LATENCY: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Calls {
    namespaces: Vec<String>,
    /// Number of calls already finished when each call started.
    finished_at_start: Vec<usize>,
    finished: usize,
}

/// Takes [`CALL_LATENCY`] to answer every call.
#[derive(Clone, Default)]
struct SlowSink(Arc<Mutex<Calls>>);

impl SlowSink {
    fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.0.lock().unwrap()
    }
}

impl MetricsSink for SlowSink {
    fn put_metric_data(&self, request: PutMetricData) -> SinkFuture<'_> {
        Box::pin(async move {
            {
                let mut calls = self.calls();
                let finished = calls.finished;
                calls.finished_at_start.push(finished);
                calls.namespaces.push(request.namespace);
            }
            tokio::time::sleep(CALL_LATENCY).await;
            self.calls().finished += 1;
            Ok(())
        })
    }
}

fn records(count: usize) -> Vec<AggregatedRecord> {
    (0..count)
        .map(|i| AggregatedRecord {
            name: format!("metric{i}"),
            namespace: "ns".into(),
            dimensions: Dimensions::from([("customerId".to_string(), "c1".to_string())]),
            unit: Some(Unit::Count),
            timestamp: Some("2018-11-15T18:43:00.000Z".into()),
            value: MetricValue::Samples(vec![1.0]),
        })
        .collect()
}

fn group(namespace: &str) -> DatapointGroup {
    DatapointGroup {
        name: "eventCount".into(),
        namespace: namespace.into(),
        dimensions: Dimensions::from([("eventName".to_string(), "LoginEvent".to_string())]),
        points: vec![Point {
            value: 1.0,
            timestamp: 1_542_307_422_079,
        }],
        unit: Some(Unit::Count),
    }
}

#[tokio::test(start_paused = true)]
async fn chunks_are_sent_at_the_same_time() {
    let sink = SlowSink::default();
    let dispatcher = CloudWatchDispatcher::new(sink.clone());

    let started = Instant::now();
    dispatcher.submit("ns", &records(45)).await.unwrap();

    check!(started.elapsed() >= CALL_LATENCY);
    check!(started.elapsed() < 2 * CALL_LATENCY);
    let calls = sink.calls();
    check!(calls.finished == 3);
    check!(calls.finished_at_start == vec![0, 0, 0]);
}

#[tokio::test(start_paused = true)]
async fn namespaces_are_processed_at_the_same_time() {
    let sink = SlowSink::default();
    let processor = DatapointsProcessor::new(sink.clone());

    let started = Instant::now();
    processor
        .process(&[group("ns1"), group("ns2")])
        .await
        .unwrap();

    check!(started.elapsed() >= CALL_LATENCY);
    check!(started.elapsed() < 2 * CALL_LATENCY);
    let calls = sink.calls();
    check!(calls.finished == 2);
    check!(calls.finished_at_start == vec![0, 0]);
    check!(calls.namespaces == vec!["ns1".to_string(), "ns2".to_string()]);
}
