// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Recording sinks for tests.
//!
//! This requires that the `test-util` feature be enabled.
//!
//! ```
//! # use cwtelemetry_core::test_util::{RecordingMetricsSink, recording_metrics_sink};
//! # use cwtelemetry_core::{MetricsSink, PutMetricData};
//! # futures::executor::block_on(async {
//! let RecordingMetricsSink { sink, inspector } = recording_metrics_sink();
//! sink.put_metric_data(PutMetricData { namespace: "ns".into(), metric_data: vec![] })
//!     .await
//!     .unwrap();
//! assert_eq!(inspector.requests().len(), 1);
//! # });
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    FlushBatch, FlushSink, FlushWait, MetricsSink, PutMetricData, SinkError, sink::SinkFuture,
};

#[derive(Debug, Default)]
struct MetricsState {
    requests: Vec<PutMetricData>,
    fail_namespaces: Vec<String>,
    fail_call: Option<usize>,
    calls: usize,
}

/// A [`MetricsSink`] that records every request it receives.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    state: Arc<Mutex<MetricsState>>,
}

/// Inspects what a [`RecordingSink`] received and controls its failures.
#[derive(Debug, Clone)]
pub struct MetricsInspector {
    state: Arc<Mutex<MetricsState>>,
}

/// A sink/inspector pair over the same recording.
pub struct RecordingMetricsSink {
    /// Pass this to the code under test.
    pub sink: RecordingSink,
    /// Keep this to look at what was sent.
    pub inspector: MetricsInspector,
}

/// Create a [`RecordingMetricsSink`].
pub fn recording_metrics_sink() -> RecordingMetricsSink {
    let sink = RecordingSink::default();
    let inspector = MetricsInspector {
        state: sink.state.clone(),
    };
    RecordingMetricsSink { sink, inspector }
}

impl MetricsInspector {
    /// Every successful request, in the order calls were made.
    pub fn requests(&self) -> Vec<PutMetricData> {
        self.lock().requests.clone()
    }

    /// Successful requests sent to `namespace`.
    pub fn requests_for(&self, namespace: &str) -> Vec<PutMetricData> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.namespace == namespace)
            .cloned()
            .collect()
    }

    /// Number of calls made, failed ones included.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    /// Make every call for `namespace` fail.
    pub fn fail_namespace(&self, namespace: impl Into<String>) {
        self.lock().fail_namespaces.push(namespace.into());
    }

    /// Make the `index`-th call (0-based) fail.
    pub fn fail_call(&self, index: usize) {
        self.lock().fail_call = Some(index);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MetricsSink for RecordingSink {
    fn put_metric_data(&self, request: PutMetricData) -> SinkFuture<'_> {
        let result = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let call = state.calls;
            state.calls += 1;
            if state.fail_call == Some(call) || state.fail_namespaces.contains(&request.namespace)
            {
                Err(SinkError::new(format!(
                    "injected failure for namespace {}",
                    request.namespace
                )))
            } else {
                state.requests.push(request);
                Ok(())
            }
        };
        Box::pin(std::future::ready(result))
    }
}

/// A [`FlushSink`] that records every batch delivered to it.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingFlushSink {
    batches: Arc<Mutex<Vec<FlushBatch>>>,
}

impl RecordingFlushSink {
    /// Create an empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every batch delivered so far.
    pub fn batches(&self) -> Vec<FlushBatch> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of deliveries so far.
    pub fn deliveries(&self) -> usize {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl FlushSink for RecordingFlushSink {
    fn deliver(&self, batch: FlushBatch) -> FlushWait {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(batch);
        FlushWait::ready()
    }
}
