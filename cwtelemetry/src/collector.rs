// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! In-process datapoint buffer with manual and timer-driven flushing.
//!
//! A [`DatapointsCollector`] stamps every added [`Datapoint`] with its
//! namespace and the time of the `add` call. On flush the buffer is drained,
//! split into chunks of at most `max_datapoints_per_flush` points, and every
//! chunk is grouped (see [`crate::batch`]) and handed to the [`FlushSink`].
//!
//! In auto mode a single-shot timer triggers the next flush `flush_frequency`
//! after the previous one finished. The timer is only re-armed once all chunks
//! of a flush have been delivered, so flushes never overlap.
//!
//! ```
//! # use cwtelemetry::collector::DatapointsCollector;
//! # use cwtelemetry_core::{Datapoint, FlushBatch, Unit};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let collector = DatapointsCollector::builder()
//!     .namespace("checkout")
//!     .build(|batch: FlushBatch| println!("{batch:?}"))
//!     .unwrap();
//!
//! collector
//!     .add([Datapoint::new("eventCount", 1.0)
//!         .dimension("eventName", "LoginEvent")
//!         .unit(Unit::Count)])
//!     .add([Datapoint::new("processingTime", 123.0).dimension("eventName", "LoginEvent")]);
//! collector.flush().await;
//! assert!(collector.get_all().is_empty());
//! # }
//! ```

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use cwtelemetry_core::{ConfigurationError, Datapoint, FlushSink, RawPoint};
use cwtelemetry_timesource::TimeSource;
use futures::{FutureExt, future::BoxFuture};
use tokio::{runtime::Handle, task::JoinHandle};

use crate::{batch::group_chunk, config::CollectorConfig};

/// Flush interval used when none is configured.
pub const DEFAULT_FLUSH_FREQUENCY: Duration = Duration::from_secs(20);

/// Chunk size used when none is configured.
pub const DEFAULT_MAX_DATAPOINTS_PER_FLUSH: usize = 500;

/// Builder for [`DatapointsCollector`]
#[derive(Debug)]
pub struct CollectorBuilder {
    namespace: Option<String>,
    auto: bool,
    enabled: bool,
    flush_frequency: Duration,
    max_datapoints_per_flush: usize,
    time_source: TimeSource,
}

impl Default for CollectorBuilder {
    fn default() -> Self {
        Self {
            namespace: None,
            auto: false,
            enabled: true,
            flush_frequency: DEFAULT_FLUSH_FREQUENCY,
            max_datapoints_per_flush: DEFAULT_MAX_DATAPOINTS_PER_FLUSH,
            time_source: TimeSource::System,
        }
    }
}

impl CollectorBuilder {
    /// Namespace stamped on every datapoint. Required.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Flush automatically every [`Self::flush_frequency`]. Defaults to `false`.
    ///
    /// Auto mode spawns the flush timer on the current tokio runtime, so
    /// [`Self::build`] must then be called from within one.
    pub fn auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }

    /// When disabled, added datapoints are dropped and no timer is ever
    /// started. Defaults to `true`.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Delay between the end of one auto flush and the start of the next.
    /// Defaults to 20 seconds.
    pub fn flush_frequency(mut self, flush_frequency: Duration) -> Self {
        self.flush_frequency = flush_frequency;
        self
    }

    /// Largest number of raw datapoints handed to the sink in one delivery.
    /// Defaults to 500.
    pub fn max_datapoints_per_flush(mut self, max: usize) -> Self {
        self.max_datapoints_per_flush = max;
        self
    }

    /// Clock used to stamp added datapoints.
    pub fn time_source(mut self, time_source: TimeSource) -> Self {
        self.time_source = time_source;
        self
    }

    /// Apply every setting of `config`. Settings it leaves unset keep their
    /// current value.
    pub fn config(mut self, config: &CollectorConfig) -> Self {
        if let Some(namespace) = &config.namespace {
            self.namespace = Some(namespace.clone());
        }
        self.auto = config.auto;
        self.enabled = config.enabled;
        self.flush_frequency = Duration::from_millis(config.flush_frequency_ms);
        self.max_datapoints_per_flush = config.max_datapoints_per_flush;
        self
    }

    /// Build the collector, delivering flushed batches to `sink`.
    ///
    /// In auto mode (and when enabled) the first flush timer is armed right
    /// away.
    pub fn build(
        self,
        sink: impl FlushSink + 'static,
    ) -> Result<DatapointsCollector, ConfigurationError> {
        let namespace = self
            .namespace
            .filter(|ns| !ns.is_empty())
            .ok_or(ConfigurationError::Missing("namespace"))?;
        if self.max_datapoints_per_flush == 0 {
            return Err(ConfigurationError::invalid(
                "max_datapoints_per_flush",
                "must be at least 1",
            ));
        }
        if self.flush_frequency.is_zero() {
            return Err(ConfigurationError::invalid(
                "flush_frequency",
                "must be greater than zero",
            ));
        }

        let running = self.enabled && self.auto;
        let runtime = if running {
            Some(Handle::try_current().map_err(|_| {
                ConfigurationError::invalid("auto", "auto flushing requires a tokio runtime")
            })?)
        } else {
            None
        };

        let inner = Arc::new(Inner {
            namespace,
            auto: self.auto,
            enabled: self.enabled,
            flush_frequency: self.flush_frequency,
            max_datapoints_per_flush: self.max_datapoints_per_flush,
            time_source: self.time_source,
            sink: Box::new(sink),
            runtime,
            state: Mutex::new(State {
                points: Vec::new(),
                stopped: !running,
                timer: None,
                generation: 0,
            }),
        });
        inner.arm_timer(&mut inner.lock());

        Ok(DatapointsCollector { inner })
    }
}

/// Buffers datapoints and flushes them, grouped and chunked, to a [`FlushSink`].
pub struct DatapointsCollector {
    inner: Arc<Inner>,
}

impl fmt::Debug for DatapointsCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatapointsCollector")
            .field("namespace", &self.inner.namespace)
            .field("auto", &self.inner.auto)
            .field("enabled", &self.inner.enabled)
            .field("flush_frequency", &self.inner.flush_frequency)
            .field(
                "max_datapoints_per_flush",
                &self.inner.max_datapoints_per_flush,
            )
            .finish_non_exhaustive()
    }
}

struct Inner {
    namespace: String,
    auto: bool,
    enabled: bool,
    flush_frequency: Duration,
    max_datapoints_per_flush: usize,
    time_source: TimeSource,
    sink: Box<dyn FlushSink>,
    runtime: Option<Handle>,
    state: Mutex<State>,
}

struct State {
    points: Vec<RawPoint>,
    stopped: bool,
    timer: Option<Timer>,
    generation: u64,
}

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl Timer {
    fn cancel(self) {
        self.handle.abort();
    }
}

impl DatapointsCollector {
    /// Start building a collector.
    pub fn builder() -> CollectorBuilder {
        CollectorBuilder::default()
    }

    /// Buffer `datapoints`, all stamped with the same timestamp.
    ///
    /// Does nothing when the collector is disabled.
    pub fn add(&self, datapoints: impl IntoIterator<Item = Datapoint>) -> &Self {
        if !self.inner.enabled {
            return self;
        }
        let timestamp = self.inner.time_source.epoch_millis();
        let namespace = self.inner.namespace.as_str();
        self.inner.lock().points.extend(
            datapoints
                .into_iter()
                .map(|datapoint| RawPoint::stamp(datapoint, namespace, timestamp)),
        );
        self
    }

    /// Drop every buffered datapoint without delivering it.
    pub fn clear(&self) -> &Self {
        self.inner.lock().points.clear();
        self
    }

    /// A copy of the buffered datapoints, in insertion order.
    pub fn get_all(&self) -> Vec<RawPoint> {
        self.inner.lock().points.clone()
    }

    /// Drain the buffer and deliver it to the sink, one delivery per chunk.
    ///
    /// Datapoints added while deliveries are in flight go to the next flush.
    /// An empty buffer delivers nothing. In auto mode the next timer is armed
    /// once every chunk was delivered.
    pub async fn flush(&self) {
        self.inner.clone().flush().await
    }

    /// Cancel the timer and flush one last time.
    ///
    /// A collector that never ran a timer (manual mode or disabled) is
    /// stopped from the start, so this does nothing on it. Calling `stop`
    /// again does nothing either.
    pub async fn stop(&self) {
        {
            let mut state = self.inner.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
            if let Some(timer) = state.timer.take() {
                timer.cancel();
            }
        }
        tracing::debug!(namespace = %self.inner.namespace, "stopping datapoints collector");
        self.inner.clone().flush().await
    }

    /// Namespace stamped on every datapoint.
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Whether added datapoints are kept.
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Whether the collector flushes on a timer.
    pub fn is_auto(&self) -> bool {
        self.inner.auto
    }

    /// Whether no further timer will be armed.
    pub fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    /// Whether a flush timer is currently pending.
    pub fn has_pending_timer(&self) -> bool {
        self.inner.lock().timer.is_some()
    }

    /// Delay between auto flushes.
    pub fn flush_frequency(&self) -> Duration {
        self.inner.flush_frequency
    }

    /// Largest number of raw datapoints per delivery.
    pub fn max_datapoints_per_flush(&self) -> usize {
        self.inner.max_datapoints_per_flush
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Boxed so the flush future and the timer task that awaits it have a
    // nameable `Send` type.
    fn flush(self: Arc<Self>) -> BoxFuture<'static, ()> {
        async move {
            let mut pending = {
                let mut state = self.lock();
                if let Some(timer) = state.timer.take() {
                    timer.cancel();
                }
                std::mem::take(&mut state.points)
            };

            if !pending.is_empty() {
                tracing::debug!(
                    namespace = %self.namespace,
                    datapoints = pending.len(),
                    "flushing datapoints"
                );
            }
            while !pending.is_empty() {
                let rest = pending.split_off(pending.len().min(self.max_datapoints_per_flush));
                let chunk = std::mem::replace(&mut pending, rest);
                let batch = group_chunk(&self.namespace, chunk);
                self.sink.deliver(batch).await;
            }

            self.arm_timer(&mut self.lock());
        }
        .boxed()
    }

    fn arm_timer(self: &Arc<Self>, state: &mut State) {
        if !self.enabled || state.stopped {
            return;
        }
        let Some(runtime) = &self.runtime else {
            return;
        };
        if let Some(timer) = state.timer.take() {
            timer.cancel();
        }

        state.generation += 1;
        let generation = state.generation;
        let weak = Arc::downgrade(self);
        let delay = self.flush_frequency;
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            fire(weak, generation).await;
        });
        state.timer = Some(Timer { generation, handle });
    }
}

async fn fire(weak: Weak<Inner>, generation: u64) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    {
        let mut state = inner.lock();
        let current = state.timer.as_ref().map(|timer| timer.generation);
        if state.stopped || current != Some(generation) {
            return;
        }
        // this task is the timer: detach rather than abort it
        state.timer = None;
    }
    inner.flush().await
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.timer.take() {
            timer.cancel();
        }
    }
}
