// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, SystemTime},
};

use crate::Time;

/// Simple static timesource that will always return the same time
#[derive(Debug)]
pub struct StaticTimeSource {
    now: SystemTime,
}

impl StaticTimeSource {
    /// Create a new StaticTimeSource that always returns the given time
    ///
    /// ```
    /// use cwtelemetry_timesource::{TimeSource, fakes::StaticTimeSource};
    /// use std::time::UNIX_EPOCH;
    ///
    /// let ts = TimeSource::custom(StaticTimeSource::at_time(UNIX_EPOCH));
    /// assert_eq!(ts.epoch_millis(), 0);
    /// ```
    pub fn at_time(time: impl Into<SystemTime>) -> Self {
        Self { now: time.into() }
    }

    /// Create a new StaticTimeSource pinned `millis` after the Unix epoch
    pub fn at_epoch_millis(millis: u64) -> Self {
        Self::at_time(SystemTime::UNIX_EPOCH + Duration::from_millis(millis))
    }
}

impl Time for StaticTimeSource {
    fn now(&self) -> SystemTime {
        self.now
    }
}

/// Time source that is loaded with one time but can be moved through a
/// shared, cloneable handle.
#[derive(Debug, Clone)]
pub struct ManuallyAdvancedTimeSource(Arc<Mutex<SystemTime>>);

impl ManuallyAdvancedTimeSource {
    /// Create a new ManuallyAdvancedTimeSource that is started with the given time.
    pub fn at_time(time: impl Into<SystemTime>) -> Self {
        Self(Arc::new(Mutex::new(time.into())))
    }

    /// Create a new ManuallyAdvancedTimeSource started `millis` after the Unix epoch
    pub fn at_epoch_millis(millis: u64) -> Self {
        Self::at_time(SystemTime::UNIX_EPOCH + Duration::from_millis(millis))
    }

    /// Replace the loaded time.
    ///
    /// ```
    /// use cwtelemetry_timesource::{TimeSource, fakes::ManuallyAdvancedTimeSource};
    /// use std::time::{Duration, UNIX_EPOCH};
    ///
    /// let clock = ManuallyAdvancedTimeSource::at_time(UNIX_EPOCH);
    /// let ts = TimeSource::custom(clock.clone());
    /// clock.update_time(UNIX_EPOCH + Duration::from_secs(100));
    /// assert_eq!(ts.epoch_millis(), 100_000);
    /// ```
    pub fn update_time(&self, time: impl Into<SystemTime>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = time.into();
    }

    /// Move the loaded time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += duration;
    }
}

impl Time for ManuallyAdvancedTimeSource {
    fn now(&self) -> SystemTime {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
