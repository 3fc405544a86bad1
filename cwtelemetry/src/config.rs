// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Process configuration.
//!
//! Settings come from a TOML document ([`Config::from_toml_str`]) or from
//! environment variables ([`Config::from_env`]):
//!
//! | variable          | setting           | default   |
//! |-------------------|-------------------|-----------|
//! | `LOG_LEVEL`       | `log_level`       | `"error"` |
//! | `SUPPRESS_ERRORS` | `suppress_errors` | `false`   |
//!
//! ```
//! # use cwtelemetry::config::Config;
//! let config = Config::from_toml_str(r#"
//!     log_level = "debug"
//!     suppress_errors = true
//!
//!     [collector]
//!     namespace = "checkout"
//!     auto = true
//!     flush_frequency_ms = 10000
//! "#).unwrap();
//! assert_eq!(config.collector.namespace.as_deref(), Some("checkout"));
//! assert_eq!(config.collector.max_datapoints_per_flush, 500);
//! ```

use cwtelemetry_core::ConfigurationError;
use serde::Deserialize;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;

use crate::{
    collector::{DEFAULT_FLUSH_FREQUENCY, DEFAULT_MAX_DATAPOINTS_PER_FLUSH},
    logging,
};

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `tracing` filter directive, e.g. `"info"` or `"cwtelemetry=debug"`.
    pub log_level: String,
    /// Swallow processing errors after logging them instead of returning them.
    pub suppress_errors: bool,
    /// Settings for an in-process [`DatapointsCollector`](crate::collector::DatapointsCollector).
    pub collector: CollectorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "error".to_owned(),
            suppress_errors: false,
            collector: CollectorConfig::default(),
        }
    }
}

/// Settings for a [`DatapointsCollector`](crate::collector::DatapointsCollector).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorConfig {
    /// Namespace stamped on collected datapoints.
    pub namespace: Option<String>,
    /// Flush on a timer.
    pub auto: bool,
    /// Keep added datapoints.
    pub enabled: bool,
    /// Delay between auto flushes, in milliseconds.
    pub flush_frequency_ms: u64,
    /// Largest number of raw datapoints per delivery.
    pub max_datapoints_per_flush: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            auto: false,
            enabled: true,
            flush_frequency_ms: DEFAULT_FLUSH_FREQUENCY.as_millis() as u64,
            max_datapoints_per_flush: DEFAULT_MAX_DATAPOINTS_PER_FLUSH,
        }
    }
}

impl Config {
    /// Parse a TOML document. Missing settings take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(source).map_err(|err| ConfigurationError::invalid("config", err.to_string()))
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_env_vars(std::env::vars())
    }

    /// Read settings from `vars`, as `(name, value)` pairs.
    pub fn from_env_vars(
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigurationError> {
        let mut config = Self::default();
        for (name, value) in vars {
            match name.as_str() {
                "LOG_LEVEL" => config.log_level = value,
                "SUPPRESS_ERRORS" => {
                    config.suppress_errors = parse_flag(&value).ok_or_else(|| {
                        ConfigurationError::invalid(
                            "SUPPRESS_ERRORS",
                            format!("`{value}` is not a yes/no value"),
                        )
                    })?
                }
                _ => {}
            }
        }
        Ok(config)
    }

    /// Install the global logger at [`Self::log_level`]. See [`logging::init`].
    pub fn init_logging(&self) -> bool {
        logging::init(&self.log_level)
    }

    /// A JSON-lines subscriber at [`Self::log_level`] writing to `writer`.
    pub fn logging_subscriber<W>(&self, writer: W) -> impl Subscriber + Send + Sync + use<W>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        logging::subscriber(&self.log_level, writer)
    }
}

/// Parse a human yes/no flag: `y`, `yes`, `true`, `on`, `1` and their
/// negations, case-insensitively and ignoring surrounding whitespace.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}
