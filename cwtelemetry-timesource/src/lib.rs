// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Wall-clock source used to stamp datapoints with epoch milliseconds.
//!
//! Production code uses [`TimeSource::System`]. Tests swap in one of the
//! [`fakes`] (behind the `test-util` feature) or, with the `tokio` feature,
//! a clock that follows tokio's paused/advanced test time.

use std::{
    fmt::Debug,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

/// Module containing fake time sources for testing
///
/// To enable this module, you must enable the `test-util` feature.
#[cfg(feature = "test-util")]
pub mod fakes;

/// Trait for providing custom time sources
pub trait Time: Send + Sync + Debug {
    /// Get the current system time
    fn now(&self) -> SystemTime;
}

/// Tokio-backed time source.
///
/// Follows tokio's `pause`/`advance` test clock, which makes it possible to
/// check the timestamps of points added across auto-flush windows.
#[cfg(feature = "tokio")]
pub mod tokio {
    use std::time::SystemTime;

    use tokio::time::Instant as TokioInstant;

    use crate::{Time, TimeSource};

    impl TimeSource {
        /// Create a new TimeSource that starts at `starting_timestamp` and moves
        /// with tokio's clock.
        ///
        /// ```
        /// # #[tokio::main(flavor = "current_thread")]
        /// # async fn main() {
        /// use std::time::{Duration, UNIX_EPOCH};
        /// use cwtelemetry_timesource::TimeSource;
        ///
        /// tokio::time::pause();
        /// let ts = TimeSource::tokio(UNIX_EPOCH);
        /// tokio::time::advance(Duration::from_millis(1500)).await;
        /// assert_eq!(ts.epoch_millis(), 1500);
        /// # }
        /// ```
        pub fn tokio(starting_timestamp: SystemTime) -> Self {
            TimeSource::custom(TokioTime::initialize_at(starting_timestamp))
        }
    }

    /// A time source implementation that uses tokio's time utilities
    #[derive(Copy, Clone, Debug)]
    pub struct TokioTime {
        start_time: TokioInstant,
        start_system_time: SystemTime,
    }

    impl TokioTime {
        /// Initialize a new TokioTime anchored at `initial_time`
        pub fn initialize_at(initial_time: SystemTime) -> Self {
            Self {
                start_time: TokioInstant::now(),
                start_system_time: initial_time,
            }
        }
    }

    impl Time for TokioTime {
        fn now(&self) -> SystemTime {
            self.start_system_time + self.start_time.elapsed()
        }
    }

}

/// Where the current wall-clock time comes from.
#[derive(Clone, Default)]
pub enum TimeSource {
    /// Use the system time
    #[default]
    System,
    /// Use a custom time source
    Custom(Arc<dyn Time>),
}

impl Debug for TimeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "TimeSource::System"),
            Self::Custom(_) => write!(f, "TimeSource::Custom(...)"),
        }
    }
}

impl TimeSource {
    /// Create a new TimeSource with a custom time implementation
    pub fn custom(custom: impl Time + 'static) -> TimeSource {
        Self::Custom(Arc::new(custom))
    }

    /// Get the current [`SystemTime`] from this time source
    pub fn system_time(&self) -> SystemTime {
        match self {
            Self::System => SystemTime::now(),
            Self::Custom(ts) => ts.now(),
        }
    }

    /// Milliseconds since the Unix epoch.
    ///
    /// Times before the epoch clamp to `0`, times past `u64::MAX` milliseconds
    /// clamp to `u64::MAX`.
    pub fn epoch_millis(&self) -> u64 {
        self.system_time()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}
