// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The two sink contracts of the pipeline.
//!
//! - [`FlushSink`] receives the grouped contents of a collector, once per
//!   flush chunk. It is a local hand-off (usually a log line) and cannot fail.
//! - [`MetricsSink`] transmits a bounded [`PutMetricData`] request to the
//!   metrics backend and can fail with a [`SinkError`].

use std::{
    fmt,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};

use crate::{FlushBatch, PutMetricData};

/// Receives one [`FlushBatch`] per flush chunk.
///
/// The returned [`FlushWait`] resolves once delivery is done; the collector
/// awaits it before delivering the next chunk and before re-arming its timer.
///
/// Any `Fn(FlushBatch)` closure is a flush sink that delivers synchronously.
pub trait FlushSink: Send + Sync {
    /// Deliver one chunk.
    fn deliver(&self, batch: FlushBatch) -> FlushWait;
}

impl<F> FlushSink for F
where
    F: Fn(FlushBatch) + Send + Sync,
{
    fn deliver(&self, batch: FlushBatch) -> FlushWait {
        self(batch);
        FlushWait::ready()
    }
}

/// This struct contains a future that can be used to wait for a flush
/// delivery to complete
#[must_use = "future does nothing unless polled"]
pub struct FlushWait(Pin<Box<dyn Future<Output = ()> + Send + 'static>>);

impl Future for FlushWait {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}

impl FlushWait {
    /// Return a FlushWait that is ready immediately
    pub fn ready() -> Self {
        Self(Box::pin(std::future::ready(())))
    }

    /// Create a FlushWait that returns when a future is ready
    pub fn from_future(f: impl Future<Output = ()> + Send + 'static) -> Self {
        Self(Box::pin(f))
    }
}

impl fmt::Debug for FlushWait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FlushWait").finish()
    }
}

/// Future returned by [`MetricsSink::put_metric_data`].
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>>;

/// Transmits one request to the metrics backend.
///
/// Callers never pass more than the backend's per-call metric limit. The
/// implementation owns timeouts and retries; the pipeline imposes none.
pub trait MetricsSink: Send + Sync {
    /// Send one request.
    fn put_metric_data(&self, request: PutMetricData) -> SinkFuture<'_>;
}

impl<S: MetricsSink + ?Sized> MetricsSink for Arc<S> {
    fn put_metric_data(&self, request: PutMetricData) -> SinkFuture<'_> {
        (**self).put_metric_data(request)
    }
}

impl<S: MetricsSink + ?Sized> MetricsSink for &S {
    fn put_metric_data(&self, request: PutMetricData) -> SinkFuture<'_> {
        (**self).put_metric_data(request)
    }
}

/// A failed call to a [`MetricsSink`].
///
/// Carries a `reported` flag: whoever logs the failure first marks it, and
/// outer layers skip logging it again. Clones share the flag.
#[derive(Clone)]
pub struct SinkError {
    source: Arc<dyn std::error::Error + Send + Sync>,
    reported: Arc<AtomicBool>,
}

impl SinkError {
    /// Wrap the backend's error.
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: Arc::from(source.into()),
            reported: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark this error as already logged.
    pub fn mark_reported(&self) {
        self.reported.store(true, Ordering::Relaxed);
    }

    /// Whether this error was already logged.
    pub fn is_reported(&self) -> bool {
        self.reported.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkError")
            .field("source", &self.source)
            .field("reported", &self.is_reported())
            .finish()
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to send metrics: {}", self.source)
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}
